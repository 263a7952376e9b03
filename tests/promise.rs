use core::time::Duration;

use anyhow::{anyhow, Context as _};
use subscale::{array, compact, encode_async, promise, u32, u8, Error, Promise, Value};
use subscale_test::assert_roundtrip_async;
use tokio::sync::oneshot;
use tokio::time::sleep;

#[test_log::test(tokio::test)]
async fn out_of_order_settlement() -> anyhow::Result<()> {
    let codec = array(&promise(&u8()));
    let (txs, promises): (Vec<_>, Vec<_>) = (0..3)
        .map(|_| {
            let (tx, rx) = oneshot::channel::<Value>();
            (tx, Value::promise(async move { anyhow::Ok(rx.await?) }))
        })
        .unzip();
    let value = Value::Array(promises);

    let settle = tokio::spawn(async move {
        for (tx, v) in txs.into_iter().zip([5u8, 0, 9]).rev() {
            sleep(Duration::from_millis(5)).await;
            tx.send(Value::from(v))
                .map_err(|_| anyhow!("promise dropped"))?;
        }
        anyhow::Ok(())
    });
    let buf = encode_async(&codec, &value).await?;
    settle.await??;

    assert_eq!(buf.as_ref(), [0x0c, 5, 0, 9]);
    assert_eq!(codec.decode(&buf)?, value);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn many_promises() -> anyhow::Result<()> {
    let codec = array(&promise(&u8()));
    let value = Value::array((0..256).map(|i| {
        Value::promise(async move {
            tokio::task::yield_now().await;
            anyhow::Ok(Value::from((i % 256) as u8))
        })
    }));
    let bufs = assert_roundtrip_async(&codec, [&value]).await?;
    let buf = &bufs[0];
    assert_eq!(buf.len(), 258);
    assert_eq!(buf[..2], [0x01, 0x04]);
    assert!(buf[2..].iter().copied().eq(0..=255));
    Ok(())
}

#[test_log::test(tokio::test)]
async fn nested_promises() -> anyhow::Result<()> {
    let codec = promise(&array(&promise(&compact(&u32()))));
    let value = Value::promise(async {
        sleep(Duration::from_millis(1)).await;
        anyhow::Ok(Value::array([
            Value::promise(async { anyhow::Ok(Value::from(1u32)) }),
            Value::from(Promise::resolved(Value::from(300u32))),
        ]))
    });
    let bufs = assert_roundtrip_async(&codec, [&value]).await?;
    assert_eq!(bufs[0], [0x08, 0x04, 0xb1, 0x04]);
    Ok(())
}

#[test_log::test(tokio::test)]
async fn rejection() -> anyhow::Result<()> {
    let codec = array(&promise(&u8()));
    let value = Value::array([
        Value::from(Promise::resolved(Value::from(1u8))),
        Value::promise(async { Err::<Value, _>(anyhow!("connection lost")) }),
    ]);
    codec.assert(&value).context("promises are not awaited by assert")?;
    let Err(Error::Custom(err)) = codec.encode_async(&value).await else {
        panic!("encoding should fail with the rejection")
    };
    assert_eq!(err.to_string(), "promise rejected: connection lost");
    Ok(())
}

#[test_log::test(tokio::test)]
async fn settled_value_is_checked() -> anyhow::Result<()> {
    let codec = promise(&u8());
    let value = Value::from(Promise::resolved(Value::from("not a byte")));
    assert!(codec.encode_async(&value).await.is_err());
    assert!(codec.encode(&value).is_err_and(|err| err.is_encode()));
    Ok(())
}
