//! Tests for result-set cursor paging, closing and procedure outputs

mod common;

use std::sync::Arc;

use common::{MockSession, int_field, int_row, int_rows};
use pretty_assertions::assert_eq;
use zero_hdb::constant::TypeCode;
use zero_hdb::cursor::CursorState;
use zero_hdb::error::{Error, ServerError};
use zero_hdb::protocol::RawRow;
use zero_hdb::{Conn, Opts, ResultSetCache, Value};

const SQL: &str = "SELECT ID FROM T";

fn conn(session: &Arc<MockSession>, opts: Opts) -> Conn {
    Conn::new(Arc::clone(session), opts, Arc::new(ResultSetCache::new()))
}

fn opts(fetch_size: u32) -> Opts {
    Opts {
        fetch_size,
        ..Opts::default()
    }
}

fn collect_ids(cursor: &mut zero_hdb::ResultSetCursor) -> Vec<i32> {
    cursor
        .rows()
        .map(|row| row.unwrap().get::<i32>(0).unwrap())
        .collect()
}

#[test]
fn two_pages_take_exactly_one_fetch() {
    common::init_tracing();
    let session = MockSession::new(1);
    session.add_query(SQL, vec![int_field("ID")], vec![Ok(int_rows(0..3)), Ok(int_rows(3..5))]);
    let mut conn = conn(&session, opts(3));

    let mut cursor = conn.query(SQL, &[]).unwrap();
    let id = cursor.result_set_id().unwrap();
    assert_eq!(collect_ids(&mut cursor), vec![0, 1, 2, 3, 4]);
    assert_eq!(session.fetches(), vec![(id, 3)]);

    // drained: no further fetches and nothing to release
    assert!(cursor.next().unwrap().is_none());
    assert_eq!(session.fetches().len(), 1);
    cursor.close().unwrap();
    cursor.close().unwrap();
    assert!(session.closed_result_sets().is_empty());
}

#[test]
fn single_page_never_fetches() {
    let session = MockSession::new(1);
    session.add_query(SQL, vec![int_field("ID")], vec![Ok(int_rows(0..2))]);
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    assert_eq!(collect_ids(&mut cursor), vec![0, 1]);
    drop(cursor);
    assert!(session.fetches().is_empty());
    assert!(session.closed_result_sets().is_empty());
}

#[test]
fn empty_page_after_fetch_ends_the_result_set() {
    let session = MockSession::new(1);
    session.add_query(SQL, vec![int_field("ID")], vec![Ok(int_rows(0..1)), Ok(Vec::new())]);
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    assert_eq!(collect_ids(&mut cursor), vec![0]);
    assert!(matches!(cursor.state(), CursorState::Exhausted));
    assert_eq!(session.fetches().len(), 1);
}

#[test]
fn early_close_releases_the_server_result_set() {
    let session = MockSession::new(1);
    session.add_query(SQL, vec![int_field("ID")], vec![Ok(int_rows(0..2)), Ok(int_rows(2..4))]);
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    let id = cursor.result_set_id().unwrap();
    assert_eq!(cursor.next().unwrap().unwrap().get::<i32>(0).unwrap(), 0);
    cursor.close().unwrap();
    cursor.close().unwrap();
    assert_eq!(session.closed_result_sets(), vec![id]);
    assert!(cursor.is_closed());
    assert!(matches!(cursor.next(), Err(Error::BadUsageError(_))));
}

#[test]
fn drop_releases_an_undrained_cursor() {
    let session = MockSession::new(1);
    session.add_query(SQL, vec![int_field("ID")], vec![Ok(int_rows(0..2)), Ok(int_rows(2..4))]);
    let mut conn = conn(&session, Opts::default());

    let cursor = conn.query(SQL, &[]).unwrap();
    let id = cursor.result_set_id().unwrap();
    drop(cursor);
    assert_eq!(session.closed_result_sets(), vec![id]);
}

#[test]
fn fetch_error_is_sticky() {
    let session = MockSession::new(1);
    session.add_query(
        SQL,
        vec![int_field("ID")],
        vec![
            Ok(int_rows(0..2)),
            Err(ServerError::new(139, "HY000", "current operation cancelled")),
            Ok(int_rows(2..4)),
        ],
    );
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    assert!(cursor.next().unwrap().is_some());
    assert!(cursor.next().unwrap().is_some());

    let Err(Error::Fetch(first)) = cursor.next() else {
        panic!("expected a fetch error");
    };
    assert_eq!(first.result_set, 0);
    assert_eq!(first.rows_delivered, 2);
    assert!(matches!(&*first.source, Error::ServerError(e) if e.code == 139));

    let Err(Error::Fetch(second)) = cursor.next() else {
        panic!("expected the same fetch error");
    };
    assert!(Arc::ptr_eq(&first.source, &second.source));
    assert_eq!(session.fetches().len(), 1);
    assert!(!cursor.has_more_result_sets());

    // no round trip on close after a failed fetch
    cursor.close().unwrap();
    assert!(session.closed_result_sets().is_empty());
}

#[test]
fn rows_iterator_stops_after_an_error() {
    let session = MockSession::new(1);
    session.add_query(
        SQL,
        vec![int_field("ID")],
        vec![
            Ok(int_rows(0..1)),
            Err(ServerError::new(139, "HY000", "current operation cancelled")),
        ],
    );
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    let mut rows = cursor.rows();
    assert!(rows.next().unwrap().is_ok());
    assert!(rows.next().unwrap().is_err());
    assert!(rows.next().is_none());
    assert!(rows.next().is_none());
}

#[test]
fn decode_error_names_the_field() {
    let session = MockSession::new(1);
    let bad = RawRow::new(vec![Some(7i32.to_le_bytes().to_vec()), Some(vec![1, 2])]);
    let good = RawRow::new(vec![
        Some(8i32.to_le_bytes().to_vec()),
        Some(9i32.to_le_bytes().to_vec()),
    ]);
    session.add_query(
        SQL,
        vec![int_field("A"), int_field("B")],
        vec![Ok(vec![good.clone(), bad, good])],
    );
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    assert!(cursor.next().unwrap().is_some());
    match cursor.next() {
        Err(Error::Field { row, field, .. }) => {
            assert_eq!(row, 1);
            assert_eq!(field, 1);
        }
        other => panic!("expected a field error, got {other:?}"),
    }
    // the cursor stays usable
    assert_eq!(cursor.next().unwrap().unwrap().get::<i32>(1).unwrap(), 9);
}

#[test]
fn column_metadata() {
    let session = MockSession::new(1);
    session.add_query(
        SQL,
        vec![
            int_field("ID"),
            zero_hdb::col::FieldDescriptor::new(TypeCode::Nvarchar, "NAME").with_length(40),
            zero_hdb::col::FieldDescriptor::new(TypeCode::Decimal, "PRICE")
                .with_precision_scale(10, 2),
        ],
        vec![Ok(Vec::new())],
    );
    let mut conn = conn(&session, Opts::default());

    let cursor = conn.query(SQL, &[]).unwrap();
    assert_eq!(cursor.columns().len(), 3);
    assert_eq!(cursor.column_type_name(0).unwrap(), "INTEGER");
    assert_eq!(cursor.column_length(1).unwrap(), (40, true));
    assert_eq!(cursor.column_precision_scale(2).unwrap(), (10, 2, true));
    assert!(cursor.column_nullable(0).unwrap());
    assert!(matches!(cursor.column(3), Err(Error::BadUsageError(_))));
}

#[test]
fn call_links_table_outputs_to_following_result_sets() {
    let session = MockSession::new(1);
    session.add_call(
        "CALL P(?)",
        vec![int_field("OUT_COUNT")],
        Some(int_row(2)),
        vec![
            ("T1", vec![int_field("ID")], vec![Ok(int_rows(0..2))]),
            (
                "T2",
                vec![int_field("ID")],
                vec![Ok(int_rows(10..11)), Ok(int_rows(11..12))],
            ),
        ],
    );
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.call("CALL P(?)", &[Value::Integer(1)]).unwrap();
    let columns: Vec<_> = cursor.columns().iter().map(|c| c.type_code).collect();
    assert_eq!(
        columns,
        vec![TypeCode::Integer, TypeCode::TableRows, TypeCode::TableRows]
    );

    let out = cursor.next().unwrap().unwrap();
    assert_eq!(out.get::<i32>(0).unwrap(), 2);
    let (Value::Rows(t1), Value::Rows(t2)) = (&out.values()[1], &out.values()[2]) else {
        panic!("expected table outputs");
    };
    let (t1, t2) = (*t1, *t2);
    assert!(cursor.next().unwrap().is_none());

    assert!(cursor.has_more_result_sets());
    assert!(cursor.advance_result_set().unwrap());
    assert_eq!(cursor.result_set_id(), Some(t1));
    assert_eq!(collect_ids(&mut cursor), vec![0, 1]);

    assert!(cursor.advance_result_set().unwrap());
    assert_eq!(cursor.result_set_id(), Some(t2));
    assert_eq!(cursor.result_set_index(), 2);
    assert_eq!(collect_ids(&mut cursor), vec![10, 11]);
    assert!(!cursor.has_more_result_sets());
    assert!(!cursor.advance_result_set().unwrap());
    assert!(conn.cache().is_empty());
}

#[test]
fn advancing_past_an_undrained_result_set_releases_it() {
    let session = MockSession::new(1);
    session.add_call(
        "CALL P",
        Vec::new(),
        None,
        vec![
            ("T1", vec![int_field("ID")], vec![Ok(int_rows(0..1)), Ok(int_rows(1..2))]),
            ("T2", vec![int_field("ID")], vec![Ok(int_rows(5..6))]),
        ],
    );
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.call("CALL P", &[]).unwrap();
    // only table outputs: the procedure row holds the two references
    assert_eq!(cursor.next().unwrap().unwrap().len(), 2);
    assert!(cursor.advance_result_set().unwrap());
    let t1 = cursor.result_set_id().unwrap();
    assert!(cursor.advance_result_set().unwrap());
    assert_eq!(session.closed_result_sets(), vec![t1]);
    assert_eq!(collect_ids(&mut cursor), vec![5]);
}

#[test]
fn corrupt_temporal_payload_is_a_field_error() {
    let session = MockSession::new(1);
    let corrupt = RawRow::new(vec![Some(i64::MIN.to_le_bytes().to_vec())]);
    let valid = RawRow::new(vec![Some(2i64.to_le_bytes().to_vec())]);
    session.add_query(
        SQL,
        vec![zero_hdb::col::FieldDescriptor::new(TypeCode::Seconddate, "TS")],
        vec![Ok(vec![corrupt, valid])],
    );
    let mut conn = conn(&session, Opts::default());

    let mut cursor = conn.query(SQL, &[]).unwrap();
    match cursor.next() {
        Err(Error::Field { row: 0, field: 0, source, .. }) => {
            assert!(matches!(*source, Error::InvalidPacket));
        }
        other => panic!("expected a field error, got {other:?}"),
    }
    let row = cursor.next().unwrap().unwrap();
    assert!(matches!(row.values()[0], Value::Time(_)));
}
