//! Schema-driven decoding of EBML master elements.
//!
//! A [`Schema`] is a static table mapping child element IDs to an output key,
//! a value decoder and a cardinality. [`EbmlDecoder`] walks one master
//! element's children against such a table and produces a [`Record`]:
//!
//! - unknown IDs are skipped, or rejected when the schema disallows them;
//! - a child that runs out of data is dropped and decoding resumes at the
//!   next sibling, so a truncated buffer keeps whatever was decoded before
//!   the cut;
//! - repeated non-multiple children and absent required children are errors.

use crate::ebml::{
    element_end, read_element_id, read_element_size, read_float, read_string, read_uint,
    skip_element,
};
use crate::error::{MkvError, Result};
use mediachapters_core::{ByteCursor, ParseConfig};
use tracing::trace;

/// How often an element may appear inside its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    /// Zero or one.
    Optional,
    /// Exactly one.
    Required,
    /// Zero or more.
    OptionalMultiple,
    /// One or more.
    Multiple,
}

impl Cardinality {
    /// Whether at least one occurrence is needed.
    pub fn is_required(self) -> bool {
        matches!(self, Cardinality::Required | Cardinality::Multiple)
    }

    /// Whether occurrences accumulate into a list.
    pub fn is_multiple(self) -> bool {
        matches!(self, Cardinality::OptionalMultiple | Cardinality::Multiple)
    }
}

/// Payload decoder of a schema field.
#[derive(Debug, Clone, Copy)]
pub enum Decode {
    /// Unsigned integer; an empty payload yields `default`.
    Uint { default: u64 },
    /// Unsigned integer read as a flag; an empty payload yields `default`.
    Bool { default: bool },
    /// 4- or 8-byte float; an empty payload yields `default`.
    Float { default: f64 },
    /// UTF-8 string.
    String,
    /// Skipped without producing a value.
    Ignore,
    /// Nested master element.
    Master(&'static Schema),
}

impl Decode {
    /// Unsigned integer defaulting to 0.
    pub const UINT: Decode = Decode::Uint { default: 0 };
    /// Flag defaulting to false.
    pub const BOOL: Decode = Decode::Bool { default: false };
    /// Float defaulting to 0.0.
    pub const FLOAT: Decode = Decode::Float { default: 0.0 };
}

/// One child element a schema knows about.
#[derive(Debug)]
pub struct Field {
    /// Element ID, with marker bits.
    pub id: u32,
    /// Key the decoded value is stored under.
    pub key: &'static str,
    /// Payload decoder.
    pub decode: Decode,
    /// Allowed number of occurrences.
    pub cardinality: Cardinality,
}

impl Field {
    /// Declare a field.
    pub const fn new(id: u32, key: &'static str, decode: Decode, cardinality: Cardinality) -> Self {
        Self {
            id,
            key,
            decode,
            cardinality,
        }
    }
}

/// Children of one kind of master element.
#[derive(Debug)]
pub struct Schema {
    /// Name of the master element, used in errors.
    pub name: &'static str,
    /// Known children.
    pub fields: &'static [Field],
    /// Skip unknown children instead of failing.
    pub allow_unknown: bool,
}

impl Schema {
    fn field(&self, id: u32) -> Option<(usize, &Field)> {
        self.fields.iter().enumerate().find(|(_, f)| f.id == id)
    }

    fn index_of(&self, key: &str) -> Option<usize> {
        self.fields.iter().position(|f| f.key == key)
    }
}

/// A decoded element value.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Uint(u64),
    Bool(bool),
    Float(f64),
    String(String),
    Master(Record),
}

impl Value {
    pub fn as_uint(&self) -> Option<u64> {
        match self {
            Value::Uint(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::Uint(v) => Some(*v != 0),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_record(&self) -> Option<&Record> {
        match self {
            Value::Master(v) => Some(v),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Slot {
    Empty,
    One(Value),
    Many(Vec<Value>),
}

/// Accumulates one master element's children while they are decoded.
#[derive(Debug)]
struct RecordBuilder {
    schema: &'static Schema,
    slots: Vec<Slot>,
}

impl RecordBuilder {
    fn new(schema: &'static Schema) -> Self {
        Self {
            schema,
            slots: vec![Slot::Empty; schema.fields.len()],
        }
    }

    fn push(&mut self, index: usize, value: Value) -> Result<()> {
        let field = &self.schema.fields[index];
        let slot = &mut self.slots[index];

        match slot {
            Slot::Empty if field.cardinality.is_multiple() => *slot = Slot::Many(vec![value]),
            Slot::Empty => *slot = Slot::One(value),
            Slot::Many(values) => values.push(value),
            Slot::One(_) => {
                return Err(MkvError::DuplicateRecord {
                    schema: self.schema.name,
                    key: field.key,
                })
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Record> {
        for (field, slot) in self.schema.fields.iter().zip(&self.slots) {
            if field.cardinality.is_required() && *slot == Slot::Empty {
                return Err(MkvError::MissingRequired {
                    schema: self.schema.name,
                    key: field.key,
                });
            }
        }
        Ok(Record {
            schema: self.schema,
            slots: self.slots,
        })
    }
}

/// A decoded master element, keyed by its schema's field keys.
#[derive(Debug, Clone)]
pub struct Record {
    schema: &'static Schema,
    slots: Vec<Slot>,
}

impl PartialEq for Record {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.schema, other.schema) && self.slots == other.slots
    }
}

impl Record {
    /// Name of the schema this record was decoded with.
    pub fn schema_name(&self) -> &'static str {
        self.schema.name
    }

    fn slot(&self, key: &str) -> Option<&Slot> {
        self.schema.index_of(key).map(|i| &self.slots[i])
    }

    /// True if at least one value was decoded under `key`.
    pub fn contains(&self, key: &str) -> bool {
        !matches!(self.slot(key), None | Some(Slot::Empty))
    }

    /// Every value decoded under `key`, in file order.
    pub fn all(&self, key: &str) -> &[Value] {
        match self.slot(key) {
            Some(Slot::One(v)) => std::slice::from_ref(v),
            Some(Slot::Many(v)) => v,
            _ => &[],
        }
    }

    /// The first value decoded under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.all(key).first()
    }

    pub fn uint(&self, key: &str) -> Option<u64> {
        self.get(key).and_then(Value::as_uint)
    }

    pub fn boolean(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(Value::as_bool)
    }

    pub fn float(&self, key: &str) -> Option<f64> {
        self.get(key).and_then(Value::as_float)
    }

    pub fn string(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    pub fn record(&self, key: &str) -> Option<&Record> {
        self.get(key).and_then(Value::as_record)
    }

    pub fn records<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a Record> + 'a {
        self.all(key).iter().filter_map(Value::as_record)
    }

    pub fn strings<'a>(&'a self, key: &str) -> impl Iterator<Item = &'a str> + 'a {
        self.all(key).iter().filter_map(Value::as_str)
    }
}

/// Decodes master elements against static schemas.
#[derive(Debug, Clone, Copy)]
pub struct EbmlDecoder {
    max_depth: u32,
}

impl Default for EbmlDecoder {
    fn default() -> Self {
        Self::new(ParseConfig::default())
    }
}

impl EbmlDecoder {
    /// Create a decoder honouring `config`'s nesting limit.
    pub fn new(config: ParseConfig) -> Self {
        Self {
            max_depth: config.max_depth,
        }
    }

    /// Decode the master element whose size field is at the cursor.
    pub fn decode_master(&self, cursor: &mut ByteCursor<'_>, schema: &'static Schema) -> Result<Record> {
        self.master(cursor, schema, 0)
    }

    fn master(&self, cursor: &mut ByteCursor<'_>, schema: &'static Schema, depth: u32) -> Result<Record> {
        if depth > self.max_depth {
            return Err(MkvError::RecursionLimit { depth });
        }

        let size = read_element_size(cursor)?;
        let end = cursor
            .position()
            .saturating_add(usize::try_from(size).unwrap_or(usize::MAX));
        let mut builder = RecordBuilder::new(schema);

        while cursor.position() < end {
            let id = match read_element_id(cursor) {
                Ok(id) => id,
                Err(e) => {
                    trace!(schema = schema.name, error = %e, "Stopped reading children");
                    break;
                }
            };

            let Some((index, field)) = schema.field(id) else {
                if !schema.allow_unknown {
                    return Err(MkvError::UnknownElement {
                        schema: schema.name,
                        id,
                        offset: cursor.position(),
                    });
                }
                trace!(schema = schema.name, id, "Skipping unknown element");
                if let Err(e) = skip_element(cursor) {
                    trace!(schema = schema.name, error = %e, "Stopped reading children");
                    break;
                }
                continue;
            };

            let start = cursor.position();
            match self.decode_value(cursor, field.decode, depth) {
                Ok(Some(value)) => builder.push(index, value)?,
                Ok(None) => {}
                Err(e) if e.is_bounds() => {
                    trace!(schema = schema.name, key = field.key, error = %e, "Abandoned child element");
                    match element_end(cursor.data(), start) {
                        Some(next) if next < cursor.len() && next > start => {
                            if cursor.seek(next).is_err() {
                                break;
                            }
                        }
                        _ => break,
                    }
                }
                Err(e) => return Err(e),
            }
        }

        builder.finish()
    }

    fn decode_value(&self, cursor: &mut ByteCursor<'_>, decode: Decode, depth: u32) -> Result<Option<Value>> {
        let value = match decode {
            Decode::Uint { default } => Value::Uint(read_uint(cursor, default)?),
            Decode::Bool { default } => Value::Bool(read_uint(cursor, u64::from(default))? != 0),
            Decode::Float { default } => Value::Float(read_float(cursor, default)?),
            Decode::String => Value::String(read_string(cursor)?),
            Decode::Ignore => {
                skip_element(cursor)?;
                return Ok(None);
            }
            Decode::Master(schema) => Value::Master(self.master(cursor, schema, depth + 1)?),
        };
        Ok(Some(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ebml::{encode_element, encode_uint_element};
    use mediachapters_core::vint::encode_vint;

    const NAME: u32 = 0x81;
    const ITEM: u32 = 0x82;
    const NESTED: u32 = 0xA0;
    const PADDING: u32 = 0xEC;

    static INNER: Schema = Schema {
        name: "Inner",
        fields: &[Field::new(ITEM, "item", Decode::UINT, Cardinality::Optional)],
        allow_unknown: true,
    };

    static OUTER: Schema = Schema {
        name: "Outer",
        fields: &[
            Field::new(NAME, "name", Decode::String, Cardinality::Required),
            Field::new(ITEM, "items", Decode::UINT, Cardinality::Multiple),
            Field::new(NESTED, "nested", Decode::Master(&INNER), Cardinality::OptionalMultiple),
            Field::new(PADDING, "padding", Decode::Ignore, Cardinality::OptionalMultiple),
        ],
        allow_unknown: true,
    };

    static STRICT: Schema = Schema {
        name: "Strict",
        fields: &[Field::new(ITEM, "item", Decode::UINT, Cardinality::Optional)],
        allow_unknown: false,
    };

    static RECURSIVE: Schema = Schema {
        name: "Recursive",
        fields: &[Field::new(NESTED, "child", Decode::Master(&RECURSIVE), Cardinality::Optional)],
        allow_unknown: true,
    };

    /// Master payload preceded by its size, as the decoder expects it.
    fn sized(children: &[Vec<u8>]) -> Vec<u8> {
        let payload: Vec<u8> = children.concat();
        let mut out = encode_vint(payload.len() as u64);
        out.extend_from_slice(&payload);
        out
    }

    fn decode(schema: &'static Schema, data: &[u8]) -> Result<Record> {
        EbmlDecoder::default().decode_master(&mut ByteCursor::new(data), schema)
    }

    #[test]
    fn test_required_and_multiple() {
        let data = sized(&[
            encode_element(NAME, b"abc"),
            encode_uint_element(ITEM, 1),
            encode_uint_element(ITEM, 2),
            encode_uint_element(ITEM, 3),
        ]);
        let record = decode(&OUTER, &data).unwrap();

        assert_eq!(record.string("name"), Some("abc"));
        let items: Vec<u64> = record.all("items").iter().filter_map(Value::as_uint).collect();
        assert_eq!(items, vec![1, 2, 3]);
        assert!(!record.contains("nested"));
    }

    #[test]
    fn test_duplicate_record() {
        let data = sized(&[
            encode_element(NAME, b"a"),
            encode_element(NAME, b"b"),
            encode_uint_element(ITEM, 1),
        ]);
        assert_eq!(
            decode(&OUTER, &data).unwrap_err(),
            MkvError::DuplicateRecord {
                schema: "Outer",
                key: "name"
            }
        );
    }

    #[test]
    fn test_missing_required() {
        let data = sized(&[encode_uint_element(ITEM, 1)]);
        assert_eq!(
            decode(&OUTER, &data).unwrap_err(),
            MkvError::MissingRequired {
                schema: "Outer",
                key: "name"
            }
        );

        // Multiple implies at least one.
        let data = sized(&[encode_element(NAME, b"a")]);
        assert!(matches!(
            decode(&OUTER, &data),
            Err(MkvError::MissingRequired { key: "items", .. })
        ));
    }

    #[test]
    fn test_unknown_and_ignored_children() {
        let data = sized(&[
            encode_element(0x4DBB, &[1, 2, 3]),
            encode_element(PADDING, &[0; 4]),
            encode_element(NAME, b"x"),
            encode_uint_element(ITEM, 9),
        ]);
        let record = decode(&OUTER, &data).unwrap();
        assert_eq!(record.string("name"), Some("x"));
        assert!(!record.contains("padding"));

        let data = sized(&[encode_element(0x4DBB, &[1])]);
        assert!(matches!(
            decode(&STRICT, &data),
            Err(MkvError::UnknownElement { id: 0x4DBB, .. })
        ));
    }

    #[test]
    fn test_nested_records() {
        let data = sized(&[
            encode_element(NAME, b"n"),
            encode_uint_element(ITEM, 1),
            encode_element(NESTED, &encode_uint_element(ITEM, 5)),
            encode_element(NESTED, &[]),
        ]);
        let record = decode(&OUTER, &data).unwrap();
        let nested: Vec<&Record> = record.records("nested").collect();
        assert_eq!(nested.len(), 2);
        assert_eq!(nested[0].uint("item"), Some(5));
        assert_eq!(nested[1].uint("item"), None);
        assert_eq!(nested[0].schema_name(), "Inner");
    }

    #[test]
    fn test_truncated_tail_keeps_decoded_children() {
        let mut data = sized(&[
            encode_element(NAME, b"kept"),
            encode_uint_element(ITEM, 7),
            encode_element(ITEM, &[0, 0, 0, 8]),
        ]);
        data.truncate(data.len() - 2);

        let record = decode(&OUTER, &data).unwrap();
        assert_eq!(record.string("name"), Some("kept"));
        assert_eq!(record.uint("items"), Some(7));
        assert_eq!(record.all("items").len(), 1);
    }

    #[test]
    fn test_malformed_child_resumes_at_next_sibling() {
        let data = sized(&[
            encode_element(NAME, b"a"),
            vec![ITEM as u8, 0x00, 0x81],
            encode_uint_element(ITEM, 4),
        ]);
        // The abandoned child's size is unreadable, so decoding stops there.
        let err = decode(&OUTER, &data).unwrap_err();
        assert!(matches!(err, MkvError::MissingRequired { key: "items", .. }));

        // Oversized integers are structural, not bounds errors.
        let data = sized(&[
            encode_element(NAME, b"a"),
            encode_element(ITEM, &[0; 9]),
        ]);
        assert!(matches!(
            decode(&OUTER, &data),
            Err(MkvError::InvalidIntegerSize { size: 9, .. })
        ));
    }

    #[test]
    fn test_oversized_master_reads_to_buffer_end() {
        let mut data = vec![0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF];
        data.extend(encode_element(NAME, b"all"));
        data.extend(encode_uint_element(ITEM, 1));

        let record = decode(&OUTER, &data).unwrap();
        assert_eq!(record.string("name"), Some("all"));
    }

    #[test]
    fn test_recursion_limit() {
        let mut element = Vec::new();
        for _ in 0..5 {
            element = encode_element(NESTED, &element);
        }
        let data = sized(&[element]);

        let decoder = EbmlDecoder::new(ParseConfig::default().with_max_depth(3));
        assert_eq!(
            decoder.decode_master(&mut ByteCursor::new(&data), &RECURSIVE),
            Err(MkvError::RecursionLimit { depth: 4 })
        );

        let decoder = EbmlDecoder::new(ParseConfig::default().with_max_depth(5));
        let record = decoder.decode_master(&mut ByteCursor::new(&data), &RECURSIVE).unwrap();
        assert!(record.record("child").is_some());
    }

    #[test]
    fn test_cardinality_flags() {
        assert!(Cardinality::Multiple.is_required());
        assert!(Cardinality::Multiple.is_multiple());
        assert!(!Cardinality::OptionalMultiple.is_required());
        assert!(!Cardinality::Required.is_multiple());
    }
}
