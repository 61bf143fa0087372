//! Integration-Tests fuer TeamService (In-Memory SQLite)

use std::sync::Arc;

use tresor_core::{TeamId, TeamRolle, UserId};
use tresor_crypto::{
    create_team_key, decrypt_team_field, unwrap_key_for_member, CryptoError, MasterKey, SecretBox,
    TeamMetadata,
};
use tresor_db::{SqliteDb, TeamRepository};
use tresor_teams::{
    BroadcastTransport, ChatEinstellungen, HistoryAnfrage, MasterKeyService, NachrichtenInhalt,
    StaticMasterKeyService, TeamChatService, TeamError, TeamService,
};

struct Umgebung {
    db: Arc<SqliteDb>,
    keys: Arc<StaticMasterKeyService>,
    teams: Arc<TeamService<SqliteDb>>,
    chat: Arc<TeamChatService<SqliteDb>>,
    cipher: SecretBox,
}

async fn umgebung() -> Umgebung {
    let db = Arc::new(
        SqliteDb::in_memory()
            .await
            .expect("In-Memory DB konnte nicht erstellt werden"),
    );
    let keys = Arc::new(StaticMasterKeyService::neu());
    let cipher = SecretBox::initialisieren().unwrap();

    let teams = TeamService::neu(Arc::clone(&db), cipher.clone(), keys.clone());
    let chat = TeamChatService::neu(
        Arc::clone(&db),
        Arc::clone(&teams),
        Arc::new(BroadcastTransport::neu(16)),
        ChatEinstellungen::default(),
    );

    Umgebung {
        db,
        keys,
        teams,
        chat,
        cipher,
    }
}

impl Umgebung {
    fn nutzer(&self) -> UserId {
        let user = UserId::new();
        self.keys.zufaellig_hinterlegen(user);
        user
    }

    async fn team(&self, owner: UserId, mitglieder: &[(UserId, TeamRolle)]) -> TeamId {
        self.teams
            .team_erstellen(owner, &TeamMetadata::new("Engineering", None), mitglieder)
            .await
            .unwrap()
            .id
    }

    async fn anzahl_teams(&self) -> i64 {
        self.db.count_teams().await.unwrap()
    }
}

// ---------------------------------------------------------------------------
// Owner, Mitglied, Nicht-Mitglied
// ---------------------------------------------------------------------------

#[tokio::test]
async fn owner_und_mitglied_lesen_namen_nicht_mitglied_nicht() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let fremder = u.nutzer();

    let team_id = u.team(owner, &[(mitglied, TeamRolle::Member)]).await;
    let team = u.teams.team_laden(team_id).await.unwrap();

    // Jeder holt den eigenen Umschlag und den eigenen Master-Key
    for user in [owner, mitglied] {
        let umschlag = u.teams.umschlag_laden(team_id, user).await.unwrap();
        let master_key = u.keys.master_key(user).await.unwrap();
        let team_key = unwrap_key_for_member(&u.cipher, &umschlag, &master_key).unwrap();
        let name = decrypt_team_field(&u.cipher, &team.metadaten.name, &team_key).unwrap();
        assert_eq!(name, "Engineering");
    }

    let err = u.teams.umschlag_laden(team_id, fremder).await.unwrap_err();
    assert!(matches!(
        err,
        TeamError::EnvelopeNotFound { team_id: t, user_id } if t == team_id && user_id == fremder
    ));
    assert!(matches!(
        u.teams.metadaten_entschluesseln(team_id, fremder).await,
        Err(TeamError::EnvelopeNotFound { .. })
    ));
}

#[tokio::test]
async fn umschlag_gehoert_nur_seinem_mitglied() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let team_id = u.team(owner, &[(mitglied, TeamRolle::Member)]).await;

    let umschlag = u.teams.umschlag_laden(team_id, mitglied).await.unwrap();
    let owner_key = u.keys.master_key(owner).await.unwrap();

    let result = unwrap_key_for_member(&u.cipher, &umschlag, &owner_key);
    assert!(matches!(result, Err(CryptoError::Authentication)));
}

#[tokio::test]
async fn falscher_master_key_beim_entsperren() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let team_id = u.team(owner, &[]).await;

    // Master-Key wurde beim Dienst ersetzt
    u.keys.hinterlegen(owner, MasterKey::zufaellig());

    let err = u
        .teams
        .team_schluessel_entsperren(team_id, owner)
        .await
        .unwrap_err();
    assert!(err.ist_authentifizierung());
}

// ---------------------------------------------------------------------------
// Erstellung
// ---------------------------------------------------------------------------

#[tokio::test]
async fn fehlender_master_key_verhindert_erstellung() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let ohne_key = UserId::new();

    let err = u
        .teams
        .team_erstellen(
            owner,
            &TeamMetadata::new("Engineering", None),
            &[(u.nutzer(), TeamRolle::Member), (ohne_key, TeamRolle::Member)],
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        TeamError::MasterKeyUnavailable { user_id, .. } if user_id == ohne_key
    ));
    assert_eq!(u.anzahl_teams().await, 0);
}

#[tokio::test]
async fn ungueltige_besetzung_wird_abgelehnt() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let meta = TeamMetadata::new("Engineering", None);

    let doppelt = u
        .teams
        .team_erstellen(
            owner,
            &meta,
            &[(mitglied, TeamRolle::Member), (mitglied, TeamRolle::Admin)],
        )
        .await;
    assert!(matches!(doppelt, Err(TeamError::UngueltigeEingabe(_))));

    let zweiter_owner = u
        .teams
        .team_erstellen(owner, &meta, &[(mitglied, TeamRolle::Owner)])
        .await;
    assert!(matches!(zweiter_owner, Err(TeamError::UngueltigeEingabe(_))));

    let leerer_name = u
        .teams
        .team_erstellen(owner, &TeamMetadata::new("  ", None), &[])
        .await;
    assert!(matches!(leerer_name, Err(TeamError::UngueltigeEingabe(_))));

    assert_eq!(u.anzahl_teams().await, 0);
}

#[tokio::test]
async fn mitglieder_und_rollen_nach_erstellung() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let admin = u.nutzer();
    let mitglied = u.nutzer();
    let team_id = u
        .team(owner, &[(admin, TeamRolle::Admin), (mitglied, TeamRolle::Member)])
        .await;

    let liste = u.teams.mitglieder(team_id, mitglied).await.unwrap();
    assert_eq!(liste.len(), 3);
    let rolle_von = |user: UserId| liste.iter().find(|m| m.user_id == user).map(|m| m.rolle);
    assert_eq!(rolle_von(owner), Some(TeamRolle::Owner));
    assert_eq!(rolle_von(admin), Some(TeamRolle::Admin));
    assert_eq!(rolle_von(mitglied), Some(TeamRolle::Member));
    assert!(liste.iter().all(|m| m.epoch == 0));
}

// ---------------------------------------------------------------------------
// Mitglieder hinzufuegen und entfernen
// ---------------------------------------------------------------------------

#[tokio::test]
async fn erneutes_hinzufuegen_ueberschreibt() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let team_id = u.team(owner, &[]).await;

    u.teams
        .mitglied_hinzufuegen(team_id, owner, mitglied, TeamRolle::Member)
        .await
        .unwrap();
    let erneut = u
        .teams
        .mitglied_hinzufuegen(team_id, owner, mitglied, TeamRolle::Admin)
        .await
        .unwrap();
    assert_eq!(erneut.rolle, TeamRolle::Admin);

    let liste = u.teams.mitglieder(team_id, owner).await.unwrap();
    assert_eq!(liste.len(), 2);

    let meta = u
        .teams
        .metadaten_entschluesseln(team_id, mitglied)
        .await
        .unwrap();
    assert_eq!(meta.name, "Engineering");
}

#[tokio::test]
async fn einwickeln_nur_mit_aktuellem_team_schluessel() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let team_id = u.team(owner, &[]).await;
    let mitglied_key = u.keys.master_key(mitglied).await.unwrap();

    // Fremder Schluessel mit passender Epoch
    let fremd = u
        .teams
        .mitglied_einwickeln(
            team_id,
            mitglied,
            TeamRolle::Member,
            &create_team_key(),
            &mitglied_key,
        )
        .await;
    assert!(matches!(fremd, Err(TeamError::UngueltigeEingabe(_))));

    let team_key = u
        .teams
        .team_schluessel_entsperren(team_id, owner)
        .await
        .unwrap();
    let umschlag = u
        .teams
        .mitglied_einwickeln(team_id, mitglied, TeamRolle::Member, &team_key, &mitglied_key)
        .await
        .unwrap();
    assert_eq!(umschlag.member_id, mitglied);
    assert_eq!(u.teams.umschlag_laden(team_id, mitglied).await.unwrap(), umschlag);

    u.teams.schluessel_rotieren(team_id, owner).await.unwrap();
    let veraltet = u
        .teams
        .mitglied_einwickeln(team_id, mitglied, TeamRolle::Member, &team_key, &mitglied_key)
        .await;
    assert!(matches!(veraltet, Err(TeamError::UngueltigeEingabe(_))));
}

#[tokio::test]
async fn entferntes_mitglied_hat_keinen_umschlag_mehr() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let bleibt = u.nutzer();
    let team_id = u
        .team(owner, &[(mitglied, TeamRolle::Member), (bleibt, TeamRolle::Member)])
        .await;

    let owner_vorher = u.teams.umschlag_laden(team_id, owner).await.unwrap();
    let bleibt_vorher = u.teams.umschlag_laden(team_id, bleibt).await.unwrap();

    u.teams
        .mitglied_entfernen(team_id, owner, mitglied)
        .await
        .unwrap();

    assert!(matches!(
        u.teams.umschlag_laden(team_id, mitglied).await,
        Err(TeamError::EnvelopeNotFound { .. })
    ));
    assert_eq!(u.teams.umschlag_laden(team_id, owner).await.unwrap(), owner_vorher);
    assert_eq!(u.teams.umschlag_laden(team_id, bleibt).await.unwrap(), bleibt_vorher);

    // Zweites Entfernen findet nichts
    assert!(matches!(
        u.teams.mitglied_entfernen(team_id, owner, mitglied).await,
        Err(TeamError::EnvelopeNotFound { .. })
    ));
}

#[tokio::test]
async fn berechtigungen_beim_verwalten() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let admin = u.nutzer();
    let mitglied = u.nutzer();
    let neu = u.nutzer();
    let team_id = u
        .team(owner, &[(admin, TeamRolle::Admin), (mitglied, TeamRolle::Member)])
        .await;

    // Member darf niemanden aufnehmen oder rotieren
    assert!(matches!(
        u.teams
            .mitglied_hinzufuegen(team_id, mitglied, neu, TeamRolle::Member)
            .await,
        Err(TeamError::KeineBerechtigung(_))
    ));
    assert!(matches!(
        u.teams.schluessel_rotieren(team_id, mitglied).await,
        Err(TeamError::KeineBerechtigung(_))
    ));

    // Admin darf aufnehmen
    u.teams
        .mitglied_hinzufuegen(team_id, admin, neu, TeamRolle::Member)
        .await
        .unwrap();

    // Owner ist nicht entfernbar und nicht herabstufbar
    assert!(matches!(
        u.teams.mitglied_entfernen(team_id, admin, owner).await,
        Err(TeamError::KeineBerechtigung(_))
    ));
    assert!(matches!(
        u.teams
            .mitglied_hinzufuegen(team_id, admin, owner, TeamRolle::Member)
            .await,
        Err(TeamError::KeineBerechtigung(_))
    ));

    // Mitglied darf selbst austreten, aber niemand anderen entfernen
    assert!(matches!(
        u.teams.mitglied_entfernen(team_id, mitglied, neu).await,
        Err(TeamError::KeineBerechtigung(_))
    ));
    u.teams
        .mitglied_entfernen(team_id, mitglied, mitglied)
        .await
        .unwrap();
}

// ---------------------------------------------------------------------------
// Metadaten und Rotation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn metadaten_aktualisieren() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let team_id = u.team(owner, &[(mitglied, TeamRolle::Member)]).await;

    let neu = TeamMetadata::new("Équipe Café ☕", Some("Zürich"));
    u.teams
        .metadaten_aktualisieren(team_id, owner, &neu)
        .await
        .unwrap();

    let gelesen = u
        .teams
        .metadaten_entschluesseln(team_id, mitglied)
        .await
        .unwrap();
    assert_eq!(gelesen, neu);

    assert!(matches!(
        u.teams.metadaten_aktualisieren(team_id, mitglied, &neu).await,
        Err(TeamError::KeineBerechtigung(_))
    ));
}

#[tokio::test]
async fn rotation_sperrt_alten_schluessel_aus() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let mitglied = u.nutzer();
    let entfernt = u.nutzer();
    let team_id = u
        .team(owner, &[(mitglied, TeamRolle::Member), (entfernt, TeamRolle::Member)])
        .await;

    let chat_id = u.chat.chat_erstellen(team_id, owner).await.unwrap();
    u.chat
        .nachricht_senden(chat_id, owner, "vor der Rotation")
        .await
        .unwrap();

    // Das entfernte Mitglied hat den alten Schluessel zwischengespeichert
    let alter_key = u
        .teams
        .team_schluessel_entsperren(team_id, entfernt)
        .await
        .unwrap();
    u.teams
        .mitglied_entfernen(team_id, owner, entfernt)
        .await
        .unwrap();

    let team = u.teams.schluessel_rotieren(team_id, owner).await.unwrap();
    assert_eq!(team.key_epoch, 1);

    // Alter Schluessel entschluesselt die neuen Metadaten nicht mehr
    let err = decrypt_team_field(&u.cipher, &team.metadaten.name, &alter_key).unwrap_err();
    assert!(err.ist_authentifizierung());

    // Verbleibende Mitglieder lesen Metadaten und alte Nachrichten weiter
    let meta = u
        .teams
        .metadaten_entschluesseln(team_id, mitglied)
        .await
        .unwrap();
    assert_eq!(meta.name, "Engineering");

    let history = u
        .chat
        .history_laden(
            mitglied,
            HistoryAnfrage {
                chat_id,
                before: None,
                limit: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(
        history[0].inhalt,
        NachrichtenInhalt::Klartext("vor der Rotation".into())
    );

    let liste = u.teams.mitglieder(team_id, owner).await.unwrap();
    assert_eq!(liste.len(), 2);
    assert!(liste.iter().all(|m| m.epoch == 1));
    assert!(matches!(
        u.teams.umschlag_laden(team_id, entfernt).await,
        Err(TeamError::EnvelopeNotFound { .. })
    ));

    // Neue Nachrichten sind fuer den alten Schluessel unlesbar
    let wire = u
        .chat
        .nachricht_senden(chat_id, mitglied, "nach der Rotation")
        .await
        .unwrap();
    let feld = wire.encrypted_field().unwrap();
    assert!(tresor_crypto::decrypt_message(&u.cipher, &feld, &alter_key)
        .unwrap_err()
        .ist_authentifizierung());
}

#[tokio::test]
async fn team_loeschen_nur_durch_owner() {
    let u = umgebung().await;
    let owner = u.nutzer();
    let admin = u.nutzer();
    let team_id = u.team(owner, &[(admin, TeamRolle::Admin)]).await;

    assert!(matches!(
        u.teams.team_loeschen(team_id, admin).await,
        Err(TeamError::KeineBerechtigung(_))
    ));

    u.teams.team_loeschen(team_id, owner).await.unwrap();
    assert!(matches!(
        u.teams.team_laden(team_id).await,
        Err(TeamError::TeamNichtGefunden(id)) if id == team_id
    ));
    assert!(matches!(
        u.teams.umschlag_laden(team_id, admin).await,
        Err(TeamError::EnvelopeNotFound { .. })
    ));
}
