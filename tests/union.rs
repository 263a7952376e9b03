use subscale::{
    field, key_literal_union, literal_union, literal_union_indexed, str, tagged_union, u16, u8,
    variant, Error, Value,
};
use subscale_test::{assert_decode_fails, assert_invalid, assert_roundtrip};

fn abc() -> anyhow::Result<subscale::Codec> {
    let codec = tagged_union(
        "type",
        [
            variant("a", []),
            variant("b", [field("value", u8())]),
            variant("c", [field("value", str()), field("extra", u16())]),
        ],
    )?;
    Ok(codec)
}

#[test_log::test]
fn tagged() -> anyhow::Result<()> {
    let codec = abc()?;
    let a = Value::object([("type", "a")]);
    let b = Value::object([("type", Value::from("b")), ("value", Value::from(7u8))]);
    let c = Value::object([
        ("type", Value::from("c")),
        ("value", Value::from("x")),
        ("extra", Value::from(0x0102u16)),
    ]);
    let bufs = assert_roundtrip(&codec, [&a, &b, &c])?;
    assert_eq!(bufs[0], [0]);
    assert_eq!(bufs[1], [1, 7]);
    assert_eq!(bufs[2], [2, 0x04, b'x', 0x02, 0x01]);
    assert_eq!(codec.static_size(), 1 + str().static_size() + 2);

    assert_invalid(
        &codec,
        [
            &Value::Null,
            &Value::object([("type", "d")]),
            &Value::object([("type", Value::from(1u8))]),
            &Value::object([("type", "b")]),
            &Value::object([("value", Value::from(7u8))]),
        ],
    )?;
    let err = assert_decode_fails(&codec, &[3])?;
    assert!(err.message.contains("invalid discriminant"), "{}", err.message);
    Ok(())
}

#[test_log::test]
fn tagged_explicit_indices() -> anyhow::Result<()> {
    let codec = tagged_union(
        "kind",
        [
            variant("ping", []).with_index(0x10),
            variant("pong", [field("seq", u8())]).with_index(0xff),
        ],
    )?;
    let ping = Value::object([("kind", "ping")]);
    let pong = Value::object([("kind", Value::from("pong")), ("seq", Value::from(1u8))]);
    let bufs = assert_roundtrip(&codec, [&ping, &pong])?;
    assert_eq!(bufs[0], [0x10]);
    assert_eq!(bufs[1], [0xff, 1]);
    assert_decode_fails(&codec, &[0])?;

    let Err(Error::Construct(err)) = tagged_union(
        "kind",
        [variant("a", []).with_index(1), variant("b", [])],
    ) else {
        panic!("duplicate discriminant should be rejected")
    };
    assert!(err.message.contains("duplicate discriminant"), "{}", err.message);
    assert!(tagged_union("kind", [variant("a", []), variant("a", [])])
        .is_err_and(|err| err.is_construct()));
    Ok(())
}

#[test_log::test]
fn literals() -> anyhow::Result<()> {
    let names = literal_union(["alice", "bob", "carol"])?;
    let values: Vec<_> = ["alice", "bob", "carol"].map(Value::from).into();
    let bufs = assert_roundtrip(&names, &values)?;
    assert_eq!(bufs, [[0], [1], [2]]);
    assert_invalid(&names, [&Value::from("dave"), &Value::Null])?;
    assert_decode_fails(&names, &[3])?;
    assert_eq!(names.to_string(), r#"$.literalUnion(["alice", "bob", "carol"])"#);
    Ok(())
}

#[test_log::test]
fn indexed_literals() -> anyhow::Result<()> {
    let interesting = literal_union_indexed([(1, 1u8), (2, 2), (4, 4), (8, 8), (0xff, 0xff)])?;
    let bufs = assert_roundtrip(&interesting, [&Value::from(8u8), &Value::from(0xffu8)])?;
    assert_eq!(bufs, [[8], [0xff]]);
    assert_invalid(&interesting, [&Value::from(3u8)])?;
    assert_decode_fails(&interesting, &[0])?;
    assert!(literal_union_indexed([(1, "a"), (1, "b")]).is_err_and(|err| err.is_construct()));
    Ok(())
}

#[test_log::test]
fn key_literals() -> anyhow::Result<()> {
    let keys = key_literal_union([Value::from("read"), Value::from("write"), Value::from(7u8)])?;
    let bufs = assert_roundtrip(&keys, [&Value::from("write"), &Value::from(7u8)])?;
    assert_eq!(bufs, [[1], [2]]);
    assert_invalid(&keys, [&Value::from("exec"), &Value::Bool(true)])?;
    assert_eq!(keys.to_string(), r#"$.keyLiteralUnion("read", "write", 7)"#);

    assert!(key_literal_union([Value::Null]).is_err_and(|err| err.is_construct()));
    assert!(key_literal_union(["a", "a"]).is_err_and(|err| err.is_construct()));
    assert!(literal_union((0..257).map(|i| Value::from(i as u16))).is_err_and(|err| err.is_construct()));
    Ok(())
}
