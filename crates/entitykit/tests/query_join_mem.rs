use asupersync::runtime::RuntimeBuilder;
use asupersync::{Cx, Outcome};

use entitykit::prelude::*;
use entitykit::{MemConnection, MemEngine};

fn unwrap_outcome<T>(outcome: Outcome<T, Error>) -> T {
    match outcome {
        Outcome::Ok(v) => v,
        Outcome::Err(e) => panic!("unexpected error: {e}"),
        Outcome::Cancelled(r) => panic!("cancelled: {r:?}"),
        Outcome::Panicked(p) => panic!("panicked: {p:?}"),
    }
}

fn entities() -> Vec<EntityDef> {
    vec![
        EntityDef::new("Company")
            .table("company")
            .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
            .field(FieldDef::new("name", ColumnType::Text))
            .computed(ComputedDef::new("name_upper", "upper(name)")),
        EntityDef::new("User")
            .table("user")
            .field(FieldDef::new("id", ColumnType::BigInt).primary_key(true))
            .field(FieldDef::new("first_name", ColumnType::Text))
            .field(FieldDef::new("last_name", ColumnType::Text).nullable(true))
            .computed(ComputedDef::new(
                "full_name",
                "first_name || ' ' || last_name",
            ))
            .relation(RelationDef::many_to_one("company", "Company").nullable(true)),
    ]
}

async fn seeded_session(cx: &Cx, engine: &MemEngine) -> Session<MemConnection> {
    let conn = engine
        .connect(&ConnectConfig::new("app_test"))
        .expect("connect");
    let session = Session::open(&entities(), conn).expect("resolve entities");
    let plan = SchemaPlan::from_entities(session.metadata());
    unwrap_outcome(plan.create_all(cx, session.backend()).await);

    let company = session
        .create("Company", &[("id", 2.into()), ("name", "coca cola".into())])
        .expect("create record");
    unwrap_outcome(session.persist_and_flush(cx, &company).await);

    let user = session
        .create(
            "User",
            &[
                ("id", 1.into()),
                ("first_name", "tony".into()),
                ("last_name", "soprano".into()),
                ("company", 2.into()),
            ],
        )
        .expect("create record");
    unwrap_outcome(session.persist_and_flush(cx, &user).await);
    session
}

#[test]
fn join_and_populate_yield_identical_records() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let engine = MemEngine::new();
        let session = seeded_session(&cx, &engine).await;

        let via_populate = unwrap_outcome(
            session
                .find_one(
                    &cx,
                    "User",
                    &1.into(),
                    &FindOptions::new().populate("company"),
                )
                .await,
        )
        .expect("row exists");

        let via_join = unwrap_outcome(
            QueryBuilder::for_entity(session.metadata(), "User")
                .expect("known entity")
                .join_and_select("company", "c")
                .expect("known relation")
                .where_eq("id", 1.into())
                .expect("known field")
                .get_single_result(&cx, session.backend())
                .await,
        )
        .expect("row exists");

        // Field for field, both paths produce the same record, computed
        // projections of the joined company included.
        assert_eq!(via_populate, via_join);
        let company = via_join.related("company").expect("joined company");
        assert_eq!(company.get("name_upper"), Some(&Value::from("COCA COLA")));
        assert_eq!(
            via_populate
                .related("company")
                .and_then(|c| c.get("name_upper")),
            Some(&Value::from("COCA COLA"))
        );
    });
}

#[test]
fn filter_on_computed_field_matches_evaluated_value() {
    let rt = RuntimeBuilder::current_thread()
        .build()
        .expect("create asupersync runtime");
    let cx = Cx::for_testing();

    rt.block_on(async {
        let engine = MemEngine::new();
        let session = seeded_session(&cx, &engine).await;

        let record = unwrap_outcome(
            QueryBuilder::for_entity(session.metadata(), "User")
                .expect("known entity")
                .where_eq("full_name", "tony soprano".into())
                .expect("known field")
                .get_single_result(&cx, session.backend())
                .await,
        )
        .expect("row exists");
        assert_eq!(record.get("id"), Some(&Value::BigInt(1)));
        assert_eq!(record.get("full_name"), Some(&Value::from("tony soprano")));

        let missing = unwrap_outcome(
            QueryBuilder::for_entity(session.metadata(), "User")
                .expect("known entity")
                .where_eq("full_name", "TONY SOPRANO".into())
                .expect("known field")
                .get_single_result(&cx, session.backend())
                .await,
        );
        assert!(missing.is_none());
    });
}

#[test]
fn builder_rejects_unknown_names_before_execution() {
    let engine = MemEngine::new();
    let conn = engine
        .connect(&ConnectConfig::new("app_test"))
        .expect("connect");
    let session = Session::open(&entities(), conn).expect("resolve entities");

    assert!(QueryBuilder::for_entity(session.metadata(), "Ghost").is_err());
    assert!(
        QueryBuilder::for_entity(session.metadata(), "User")
            .expect("known entity")
            .join_and_select("employer", "e")
            .is_err()
    );
    assert!(
        QueryBuilder::for_entity(session.metadata(), "User")
            .expect("known entity")
            .where_eq("nickname", "t".into())
            .is_err()
    );
}
