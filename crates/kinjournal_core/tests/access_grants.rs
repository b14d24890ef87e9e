use chrono_tz::Tz;
use kinjournal_core::model::progeny::Progeny;
use kinjournal_core::repo::access_repo::{AccessRepository, SqliteAccessRepository};
use kinjournal_core::{open_db_in_memory, AccessLevel, RepoError, ValidationError, ViewerContext};
use uuid::Uuid;

#[test]
fn progeny_round_trips_and_rejects_blank_names() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccessRepository::new(&conn);

    let mut progeny = Progeny::new("Ada");
    progeny.time_zone = "Europe/Oslo".to_string();
    progeny.id = repo.create_progeny(&progeny).unwrap();
    assert_eq!(repo.get_progeny(progeny.id).unwrap(), Some(progeny.clone()));

    progeny.nick_name = "Addy".to_string();
    repo.update_progeny(&progeny).unwrap();
    assert_eq!(
        repo.get_progeny(progeny.id).unwrap().unwrap().nick_name,
        "Addy"
    );

    let err = repo.create_progeny(&Progeny::new("  ")).unwrap_err();
    assert!(matches!(
        err,
        RepoError::Validation(ValidationError::EmptyField("name"))
    ));
}

#[test]
fn granting_twice_replaces_the_level() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccessRepository::new(&conn);
    let progeny_id = repo.create_progeny(&Progeny::new("Ada")).unwrap();
    let user = Uuid::new_v4();

    let first = repo.grant(user, progeny_id, AccessLevel::Friends).unwrap();
    let second = repo.grant(user, progeny_id, AccessLevel::Family).unwrap();

    assert_eq!(first.access_id, second.access_id);
    assert_eq!(second.access_level, AccessLevel::Family);
    assert_eq!(repo.grants_for_progeny(progeny_id).unwrap(), vec![second]);
}

#[test]
fn revoke_removes_grant_and_reports_missing_ones() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccessRepository::new(&conn);
    let progeny_id = repo.create_progeny(&Progeny::new("Ada")).unwrap();
    let user = Uuid::new_v4();
    repo.grant(user, progeny_id, AccessLevel::Users).unwrap();

    repo.revoke(user, progeny_id).unwrap();
    assert!(repo.get_grant(user, progeny_id).unwrap().is_none());
    assert!(matches!(
        repo.revoke(user, progeny_id),
        Err(RepoError::NotFound {
            kind: "user_access",
            ..
        })
    ));
}

#[test]
fn viewer_context_loads_every_grant_of_the_user() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccessRepository::new(&conn);
    let ada = repo.create_progeny(&Progeny::new("Ada")).unwrap();
    let bo = repo.create_progeny(&Progeny::new("Bo")).unwrap();
    let cy = repo.create_progeny(&Progeny::new("Cy")).unwrap();
    let user = Uuid::new_v4();
    repo.grant(user, ada, AccessLevel::Private).unwrap();
    repo.grant(user, bo, AccessLevel::Friends).unwrap();
    repo.grant(Uuid::new_v4(), cy, AccessLevel::Private).unwrap();

    let viewer = ViewerContext::load(&conn, user, Tz::Europe__Oslo).unwrap();

    assert_eq!(viewer.access_level_for(ada), Some(AccessLevel::Private));
    assert_eq!(viewer.access_level_for(bo), Some(AccessLevel::Friends));
    assert_eq!(viewer.access_level_for(cy), None);
    assert_eq!(viewer.progeny_ids().collect::<Vec<_>>(), vec![ada, bo]);
}

#[test]
fn empty_progeny_selection_means_every_granted_progeny() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccessRepository::new(&conn);
    let ada = repo.create_progeny(&Progeny::new("Ada")).unwrap();
    let bo = repo.create_progeny(&Progeny::new("Bo")).unwrap();
    let cy = repo.create_progeny(&Progeny::new("Cy")).unwrap();
    let user = Uuid::new_v4();
    repo.grant(user, ada, AccessLevel::Family).unwrap();
    repo.grant(user, cy, AccessLevel::Public).unwrap();

    let viewer = ViewerContext::load(&conn, user, Tz::UTC).unwrap();

    assert_eq!(viewer.progeny_or_all(Vec::new()), vec![ada, cy]);
    assert_eq!(viewer.progeny_or_all(vec![bo]), vec![bo]);
}

#[test]
fn deleting_progeny_cascades_to_grants() {
    let conn = open_db_in_memory().unwrap();
    let repo = SqliteAccessRepository::new(&conn);
    let progeny_id = repo.create_progeny(&Progeny::new("Ada")).unwrap();
    let user = Uuid::new_v4();
    repo.grant(user, progeny_id, AccessLevel::Family).unwrap();

    conn.execute("DELETE FROM progeny WHERE id = ?1;", [progeny_id])
        .unwrap();

    assert!(repo.grants_for_user(user).unwrap().is_empty());
}
