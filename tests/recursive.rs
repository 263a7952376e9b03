use std::sync::LazyLock;

use subscale::{deferred, field, object, option, tagged_union, u8, variant, Codec, Value};
use subscale_test::{assert_invalid, assert_roundtrip};

static LINKED_LIST: LazyLock<Codec> = LazyLock::new(|| {
    option(&object([
        field("val", u8()),
        field("next", deferred(|| LINKED_LIST.clone())),
    ]))
    .expect("object is not an option")
});

static TREE: LazyLock<Codec> = LazyLock::new(|| {
    tagged_union(
        "type",
        [
            variant("leaf", [field("value", u8())]),
            variant(
                "node",
                [
                    field("left", deferred(|| TREE.clone())),
                    field("right", deferred(|| TREE.clone())),
                ],
            ),
        ],
    )
    .expect("valid union")
});

fn list(values: impl IntoIterator<Item = u8, IntoIter: DoubleEndedIterator>) -> Value {
    values
        .into_iter()
        .rev()
        .fold(Value::Undefined, |next, val| {
            Value::object([("val", Value::from(val)), ("next", next)])
        })
}

fn leaf(value: u8) -> Value {
    Value::object([("type", Value::from("leaf")), ("value", Value::from(value))])
}

fn node(left: Value, right: Value) -> Value {
    Value::object([("type", Value::from("node")), ("left", left), ("right", right)])
}

#[test_log::test]
fn linked_list_roundtrip() -> anyhow::Result<()> {
    let bufs = assert_roundtrip(&LINKED_LIST, [&list([]), &list([1]), &list([1, 2, 3])])?;
    assert_eq!(bufs[0], [0]);
    assert_eq!(bufs[1], [1, 1, 0]);
    assert_eq!(bufs[2], [1, 1, 1, 2, 1, 3, 0]);
    Ok(())
}

#[test_log::test]
fn linked_list_invalid() -> anyhow::Result<()> {
    assert_invalid(
        &LINKED_LIST,
        [
            &Value::Null,
            &Value::object([("val", Value::from(1u8)), ("next", Value::Null)]),
            &Value::object([("val", Value::from(-1i8)), ("next", Value::Undefined)]),
        ],
    )?;
    let deep = Value::object([
        ("val", Value::from(1u8)),
        (
            "next",
            Value::object([("val", Value::from(-1i8)), ("next", Value::Undefined)]),
        ),
    ]);
    let err = LINKED_LIST.assert(&deep).expect_err("assertion should fail");
    let subscale::Error::Assert(err) = err else {
        panic!("expected an assertion error")
    };
    assert_eq!(err.path, ".next.val");
    Ok(())
}

#[test_log::test]
fn linked_list_deep() -> anyhow::Result<()> {
    let value = list((0..1000).map(|i| (i % 256) as u8));
    let bufs = assert_roundtrip(&LINKED_LIST, [&value])?;
    assert_eq!(bufs[0].len(), 2001);

    let mut buf = [1u8, 0].repeat(1000);
    buf.push(0);
    let decoded = LINKED_LIST.decode(&buf)?;
    assert_eq!(decoded, list(vec![0; 1000]));
    Ok(())
}

#[test_log::test]
fn tree_deep() -> anyhow::Result<()> {
    let value = (0..500).fold(leaf(0), |acc, i| node(acc, leaf((i % 256) as u8)));
    let bufs = assert_roundtrip(&TREE, [&value])?;
    assert_eq!(bufs[0].len(), 500 + 2 * 501);
    Ok(())
}

#[test_log::test]
fn linked_list_printing_terminates() {
    assert_eq!(
        LINKED_LIST.to_string(),
        r#"$0 = $.option($.object($.field("val", $.u8), $.field("next", $.deferred($0))))"#
    );
    assert_eq!(
        format!("{:?}", *LINKED_LIST),
        r#"Codec($0 = $.option($.object($.field("val", $.u8), $.field("next", $.deferred($0)))))"#
    );
}

#[test_log::test]
fn tree() -> anyhow::Result<()> {
    let value = node(node(leaf(1), leaf(2)), leaf(3));
    let bufs = assert_roundtrip(&TREE, [&leaf(0), &value])?;
    assert_eq!(bufs[0], [0, 0]);
    assert_eq!(bufs[1], [1, 1, 0, 1, 0, 2, 0, 3]);
    assert_eq!(
        TREE.to_string(),
        r#"$0 = $.taggedUnion("type", [$.variant("leaf", $.field("value", $.u8)), $.variant("node", $.field("left", $.deferred($0)), $.field("right", $.deferred($0)))])"#
    );
    Ok(())
}
