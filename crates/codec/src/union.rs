use std::collections::{BTreeMap, HashMap};

use num_bigint::BigInt;

use crate::object::object;
use crate::{
    create_codec, Arg, Codec, DecodeBuffer, EncodeBuffer, Error, FactoryId, Metadata, RawCodec,
    Value,
};

/// Maximum number of members of a union with single-byte discriminants
const MAX_MEMBERS: usize = 256;

/// Maps each discriminant byte to a member index
struct DiscriminantTable(Box<[Option<usize>; MAX_MEMBERS]>);

impl DiscriminantTable {
    fn new(discriminants: impl IntoIterator<Item = u8>) -> Result<Self, Error> {
        let mut table = Box::new([None; MAX_MEMBERS]);
        for (i, d) in discriminants.into_iter().enumerate() {
            let slot = &mut table[usize::from(d)];
            if slot.is_some() {
                return Err(Error::construct(format!("duplicate discriminant `{d}`")));
            }
            *slot = Some(i);
        }
        Ok(Self(table))
    }

    fn get(&self, d: u8) -> Option<usize> {
        self.0[usize::from(d)]
    }
}

/// Assigns positional discriminants, failing if there are too many members
fn positional(n: usize) -> Result<impl Iterator<Item = u8>, Error> {
    if n > MAX_MEMBERS {
        return Err(Error::construct(format!(
            "union has {n} members, at most {MAX_MEMBERS} are supported"
        )));
    }
    Ok((0..n).map(|i| i as u8))
}

/// Single variant of a [tagged_union]
#[derive(Clone, Debug)]
pub struct Variant {
    tag: String,
    fields: Vec<Codec>,
    index: Option<u8>,
}

/// Variant `tag` with object `fields`, see [tagged_union]
pub fn variant(tag: impl Into<String>, fields: impl IntoIterator<Item = Codec>) -> Variant {
    Variant {
        tag: tag.into(),
        fields: fields.into_iter().collect(),
        index: None,
    }
}

impl Variant {
    /// Sets an explicit discriminant, by default the position within the union is used
    #[must_use]
    pub fn with_index(mut self, index: u8) -> Self {
        self.index = Some(index);
        self
    }

    fn metadata(&self) -> Metadata {
        let mut args = vec![Arg::from(self.tag.clone())];
        args.extend(self.fields.iter().map(Arg::from));
        if let Some(index) = self.index {
            args.push(Arg::from(usize::from(index)));
        }
        Metadata::factory("$.variant", FactoryId::VARIANT, args)
    }
}

struct Member {
    tag: String,
    discriminant: u8,
    body: Codec,
}

struct TaggedUnion {
    key: String,
    members: Vec<Member>,
    by_tag: HashMap<String, usize>,
    table: DiscriminantTable,
}

impl TaggedUnion {
    fn member<'a>(&'a self, value: &Value) -> Result<&'a Member, String> {
        let Value::Object(fields) = value else {
            return Err("expected an object".into());
        };
        let Some(Value::Str(tag)) = fields.get(&self.key) else {
            return Err(format!("expected a string `{}` field", self.key));
        };
        self.by_tag
            .get(tag)
            .map(|i| &self.members[*i])
            .ok_or_else(|| format!("unknown variant `{tag}`"))
    }
}

impl RawCodec for TaggedUnion {
    fn static_size(&self) -> usize {
        1 + self
            .members
            .iter()
            .map(|member| member.body.static_size())
            .max()
            .unwrap_or_default()
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let member = self
            .member(value)
            .map_err(|message| Error::encode(this, value, message))?;
        dst.put_u8(member.discriminant);
        member.body.encode_into(dst, value)
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let mut fields = BTreeMap::default();
        self.decode_fields(this, src, &mut fields)?;
        Ok(Value::Object(fields))
    }

    fn decode_fields(
        &self,
        this: &Codec,
        src: &mut DecodeBuffer<'_>,
        fields: &mut BTreeMap<String, Value>,
    ) -> Result<(), Error> {
        let d = src.read_u8(this)?;
        let Some(member) = self.table.get(d).map(|i| &self.members[i]) else {
            return Err(src.error(this, format!("invalid discriminant `{d}`")));
        };
        member.body.decode_fields_into(src, fields)?;
        fields.insert(self.key.clone(), Value::Str(member.tag.clone()));
        Ok(())
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        let member = self
            .member(value)
            .map_err(|message| Error::assert(this, value, message))?;
        member.body.assert(value)
    }
}

/// Union of object variants, discriminated by the string field `key`
///
/// The wire format is the discriminant byte followed by the fields of the variant.
pub fn tagged_union(
    key: impl Into<String>,
    variants: impl IntoIterator<Item = Variant>,
) -> Result<Codec, Error> {
    let key = key.into();
    let variants: Vec<_> = variants.into_iter().collect();
    let discriminants: Vec<_> = positional(variants.len())?
        .zip(&variants)
        .map(|(i, v)| v.index.unwrap_or(i))
        .collect();
    let table = DiscriminantTable::new(discriminants.iter().copied())?;
    let mut by_tag = HashMap::with_capacity(variants.len());
    for (i, v) in variants.iter().enumerate() {
        if by_tag.insert(v.tag.clone(), i).is_some() {
            return Err(Error::construct(format!("duplicate variant `{}`", v.tag)));
        }
    }
    let metadata = Metadata::factory(
        "$.taggedUnion",
        FactoryId::TAGGED_UNION,
        [
            Arg::from(key.clone()),
            Arg::List(variants.iter().map(|v| Arg::from(v.metadata())).collect()),
        ],
    );
    let members = variants
        .into_iter()
        .zip(discriminants)
        .map(|(v, discriminant)| Member {
            body: object(v.fields),
            tag: v.tag,
            discriminant,
        })
        .collect();
    Ok(create_codec(
        [metadata],
        TaggedUnion {
            key,
            members,
            by_tag,
            table,
        },
    ))
}

/// Hashable literal
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
enum Key {
    Str(String),
    Int(BigInt),
}

impl Key {
    fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Str(s) => Some(Self::Str(s.clone())),
            Value::Int(n) => Some(Self::Int(n.clone())),
            _ => None,
        }
    }
}

struct Literals {
    members: Vec<(u8, Value)>,
    table: DiscriminantTable,
    keys: Option<HashMap<Key, usize>>,
}

impl Literals {
    fn new(members: Vec<(u8, Value)>, keyed: bool) -> Result<Self, Error> {
        let table = DiscriminantTable::new(members.iter().map(|(d, _)| *d))?;
        let keys = if keyed {
            let mut keys = HashMap::with_capacity(members.len());
            for (i, (_, value)) in members.iter().enumerate() {
                let key = Key::from_value(value).ok_or_else(|| {
                    Error::construct(format!("{value:?} is not a string or an integer"))
                })?;
                if keys.insert(key, i).is_some() {
                    return Err(Error::construct(format!("duplicate member {value:?}")));
                }
            }
            Some(keys)
        } else {
            for (i, (_, value)) in members.iter().enumerate() {
                if members[..i].iter().any(|(_, other)| other == value) {
                    return Err(Error::construct(format!("duplicate member {value:?}")));
                }
            }
            None
        };
        Ok(Self {
            members,
            table,
            keys,
        })
    }

    fn position(&self, value: &Value) -> Option<usize> {
        if let Some(keys) = &self.keys {
            Key::from_value(value).and_then(|key| keys.get(&key).copied())
        } else {
            self.members.iter().position(|(_, member)| member == value)
        }
    }
}

impl RawCodec for Literals {
    fn static_size(&self) -> usize {
        1
    }

    fn encode(&self, this: &Codec, dst: &mut EncodeBuffer, value: &Value) -> Result<(), Error> {
        let Some(i) = self.position(value) else {
            return Err(Error::encode(this, value, "value is not a member of the union"));
        };
        dst.put_u8(self.members[i].0);
        Ok(())
    }

    fn decode(&self, this: &Codec, src: &mut DecodeBuffer<'_>) -> Result<Value, Error> {
        let d = src.read_u8(this)?;
        self.table
            .get(d)
            .map(|i| self.members[i].1.clone())
            .ok_or_else(|| src.error(this, format!("invalid discriminant `{d}`")))
    }

    fn assert(&self, this: &Codec, value: &Value) -> Result<(), Error> {
        if self.position(value).is_some() {
            Ok(())
        } else {
            Err(Error::assert(this, value, "value is not a member of the union"))
        }
    }
}

/// Union of literal values, discriminated by their position
pub fn literal_union<V: Into<Value>>(values: impl IntoIterator<Item = V>) -> Result<Codec, Error> {
    let values: Vec<Value> = values.into_iter().map(Into::into).collect();
    let members = positional(values.len())?.zip(values).collect();
    let raw = Literals::new(members, false)?;
    let args = raw.members.iter().map(|(_, v)| Arg::from(v.clone())).collect();
    Ok(create_codec(
        [Metadata::factory(
            "$.literalUnion",
            FactoryId::LITERAL_UNION,
            [Arg::List(args)],
        )],
        raw,
    ))
}

/// Union of literal values with explicit discriminants
pub fn literal_union_indexed<V: Into<Value>>(
    members: impl IntoIterator<Item = (u8, V)>,
) -> Result<Codec, Error> {
    let members = members.into_iter().map(|(d, v)| (d, v.into())).collect();
    let raw = Literals::new(members, false)?;
    let args = raw
        .members
        .iter()
        .map(|(d, v)| Arg::List(vec![Arg::from(usize::from(*d)), Arg::from(v.clone())]))
        .collect();
    Ok(create_codec(
        [Metadata::factory(
            "$.literalUnion",
            FactoryId::LITERAL_UNION,
            [Arg::List(args)],
        )],
        raw,
    ))
}

/// Union of string or integer keys, discriminated by their position
///
/// Unlike [literal_union], members are looked up by hash.
pub fn key_literal_union<V: Into<Value>>(keys: impl IntoIterator<Item = V>) -> Result<Codec, Error> {
    let keys: Vec<Value> = keys.into_iter().map(Into::into).collect();
    let members = positional(keys.len())?.zip(keys).collect();
    let raw = Literals::new(members, true)?;
    let args: Vec<_> = raw.members.iter().map(|(_, v)| Arg::from(v.clone())).collect();
    Ok(create_codec(
        [Metadata::factory(
            "$.keyLiteralUnion",
            FactoryId::KEY_LITERAL_UNION,
            args,
        )],
        raw,
    ))
}
