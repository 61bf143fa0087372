//! Integration-Tests fuer ChatRepository (In-Memory SQLite)

use tresor_db::{
    models::{NachrichtenFilter, NeueNachricht, NeuesTeam, VerschluesselteMetadaten},
    ChatRepository, DbError, SqliteDb, TeamRepository,
};
use uuid::Uuid;

async fn db_mit_team() -> (SqliteDb, Uuid) {
    let db = SqliteDb::in_memory()
        .await
        .expect("In-Memory DB konnte nicht erstellt werden");
    let team_id = Uuid::new_v4();
    let nonce = [0u8; 24];

    db.create_team(
        NeuesTeam {
            id: team_id,
            created_by: Uuid::new_v4(),
            metadaten: VerschluesselteMetadaten {
                name_ciphertext: b"ct",
                name_nonce: &nonce,
                description_ciphertext: b"ct",
                description_nonce: &nonce,
            },
        },
        &[],
    )
    .await
    .unwrap();

    (db, team_id)
}

async fn nachricht_senden(db: &SqliteDb, chat_id: Uuid, inhalt: &[u8]) {
    db.create_message(NeueNachricht {
        chat_id,
        sender_id: Uuid::new_v4(),
        ciphertext: inhalt,
        nonce: &[1u8; 24],
        key_epoch: 0,
    })
    .await
    .unwrap();
}

#[tokio::test]
async fn chat_anlegen_und_laden() {
    let (db, team_id) = db_mit_team().await;

    let chat = db.create_chat(team_id).await.unwrap();
    let geladen = db.get_chat(chat.id).await.unwrap().unwrap();
    assert_eq!(geladen.team_id, team_id);

    db.create_chat(team_id).await.unwrap();
    assert_eq!(db.list_chats(team_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn chat_ohne_team_schlaegt_fehl() {
    let (db, _) = db_mit_team().await;
    assert!(db.create_chat(Uuid::new_v4()).await.is_err());
}

#[tokio::test]
async fn history_ist_chronologisch() {
    let (db, team_id) = db_mit_team().await;
    let chat = db.create_chat(team_id).await.unwrap();

    for i in 0..5u8 {
        nachricht_senden(&db, chat.id, &[i]).await;
    }

    let history = db
        .get_history(NachrichtenFilter {
            chat_id: chat.id,
            ..Default::default()
        })
        .await
        .unwrap();

    let inhalte: Vec<u8> = history.iter().map(|n| n.ciphertext[0]).collect();
    assert_eq!(inhalte, vec![0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn history_limit_liefert_neueste() {
    let (db, team_id) = db_mit_team().await;
    let chat = db.create_chat(team_id).await.unwrap();

    for i in 0..5u8 {
        nachricht_senden(&db, chat.id, &[i]).await;
    }

    let history = db
        .get_history(NachrichtenFilter {
            chat_id: chat.id,
            before: None,
            limit: Some(2),
        })
        .await
        .unwrap();

    let inhalte: Vec<u8> = history.iter().map(|n| n.ciphertext[0]).collect();
    assert_eq!(inhalte, vec![3, 4]);
}

#[tokio::test]
async fn history_ist_pro_chat_getrennt() {
    let (db, team_id) = db_mit_team().await;
    let chat_a = db.create_chat(team_id).await.unwrap();
    let chat_b = db.create_chat(team_id).await.unwrap();

    nachricht_senden(&db, chat_a.id, b"a").await;
    nachricht_senden(&db, chat_b.id, b"b").await;

    let history = db
        .get_history(NachrichtenFilter {
            chat_id: chat_a.id,
            ..Default::default()
        })
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].ciphertext, b"a");

    assert_eq!(db.list_team_messages(team_id).await.unwrap().len(), 2);
}

#[tokio::test]
async fn nachricht_mit_veralteter_epoch_wird_abgelehnt() {
    let (db, team_id) = db_mit_team().await;
    let chat = db.create_chat(team_id).await.unwrap();

    let ergebnis = db
        .create_message(NeueNachricht {
            chat_id: chat.id,
            sender_id: Uuid::new_v4(),
            ciphertext: b"ct",
            nonce: &[1u8; 24],
            key_epoch: 2,
        })
        .await;

    assert!(matches!(
        ergebnis,
        Err(DbError::EpochKonflikt {
            erwartet: 2,
            gespeichert: 0
        })
    ));
    assert!(db.list_team_messages(team_id).await.unwrap().is_empty());
}

#[tokio::test]
async fn nachricht_ohne_chat_wird_abgelehnt() {
    let (db, _) = db_mit_team().await;

    let ergebnis = db
        .create_message(NeueNachricht {
            chat_id: Uuid::new_v4(),
            sender_id: Uuid::new_v4(),
            ciphertext: b"ct",
            nonce: &[1u8; 24],
            key_epoch: 0,
        })
        .await;

    assert!(matches!(ergebnis, Err(DbError::NichtGefunden(_))));
}

#[tokio::test]
async fn nachricht_erhoeht_team_revision() {
    let (db, team_id) = db_mit_team().await;
    let chat = db.create_chat(team_id).await.unwrap();

    nachricht_senden(&db, chat.id, b"x").await;
    nachricht_senden(&db, chat.id, b"y").await;

    assert_eq!(db.get_team(team_id).await.unwrap().unwrap().revision, 2);
}
