//! Fixed-width little-endian account layouts
//!
//! A layout is declared as JSON, e.g.
//! `[{"name":"is_init","type":"u8"},{"name":"value","type":"u32"}]`,
//! using the buffer-layout field names Solana programs are usually described
//! with.

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use serde_json::{Map, Number, Value};

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LayoutField {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scalar {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl Scalar {
    fn parse(kind: &str) -> Option<Self> {
        Some(match kind {
            "u8" => Scalar::U8,
            "u16" => Scalar::U16,
            "u32" => Scalar::U32,
            "nu64" | "u64" => Scalar::U64,
            "s8" | "i8" => Scalar::I8,
            "s16" | "i16" => Scalar::I16,
            "s32" | "i32" => Scalar::I32,
            "ns64" | "i64" => Scalar::I64,
            "f32" => Scalar::F32,
            "f64" => Scalar::F64,
            _ => return None,
        })
    }

    fn width(self) -> usize {
        match self {
            Scalar::U8 | Scalar::I8 => 1,
            Scalar::U16 | Scalar::I16 => 2,
            Scalar::U32 | Scalar::I32 | Scalar::F32 => 4,
            Scalar::U64 | Scalar::I64 | Scalar::F64 => 8,
        }
    }
}

/// Ordered struct of scalar fields
#[derive(Debug, Clone, PartialEq)]
pub struct ProgramLayout {
    fields: Vec<(String, Scalar)>,
}

impl ProgramLayout {
    pub fn parse(json: &str) -> Result<Self> {
        let fields: Vec<LayoutField> =
            serde_json::from_str(json).context("Invalid program layout")?;
        let fields = fields
            .into_iter()
            .map(|f| match Scalar::parse(&f.kind) {
                Some(scalar) => Ok((f.name, scalar)),
                None => bail!("Unsupported layout type '{}' for field '{}'", f.kind, f.name),
            })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { fields })
    }

    /// Total encoded size in bytes
    pub fn span(&self) -> usize {
        self.fields.iter().map(|(_, s)| s.width()).sum()
    }

    pub fn decode(&self, data: &[u8]) -> Result<Map<String, Value>> {
        if data.len() < self.span() {
            bail!(
                "Account data is {} bytes, layout needs {}",
                data.len(),
                self.span()
            );
        }
        let mut offset = 0;
        let mut out = Map::new();
        for (name, scalar) in &self.fields {
            let bytes = &data[offset..offset + scalar.width()];
            offset += scalar.width();
            out.insert(name.clone(), read(*scalar, bytes));
        }
        Ok(out)
    }

    /// Encode named values; absent fields are zero-filled
    pub fn encode(&self, values: &Map<String, Value>) -> Result<Vec<u8>> {
        let mut out = Vec::with_capacity(self.span());
        for (name, scalar) in &self.fields {
            match values.get(name) {
                None | Some(Value::Null) => out.extend(std::iter::repeat(0u8).take(scalar.width())),
                Some(value) => write(*scalar, value, &mut out)
                    .with_context(|| format!("Field '{name}'"))?,
            }
        }
        Ok(out)
    }
}

fn read(scalar: Scalar, bytes: &[u8]) -> Value {
    let mut buf = [0u8; 8];
    buf[..bytes.len()].copy_from_slice(bytes);
    match scalar {
        Scalar::U8 | Scalar::U16 | Scalar::U32 | Scalar::U64 => {
            Value::Number(u64::from_le_bytes(buf).into())
        }
        Scalar::I8 => Value::Number((bytes[0] as i8).into()),
        Scalar::I16 => Value::Number(i16::from_le_bytes([bytes[0], bytes[1]]).into()),
        Scalar::I32 => {
            Value::Number(i32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]).into())
        }
        Scalar::I64 => Value::Number(i64::from_le_bytes(buf).into()),
        Scalar::F32 => {
            let v = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            Number::from_f64(v as f64).map_or(Value::Null, Value::Number)
        }
        Scalar::F64 => Number::from_f64(f64::from_le_bytes(buf)).map_or(Value::Null, Value::Number),
    }
}

fn number(value: &Value) -> Option<Number> {
    match value {
        Value::Number(n) => Some(n.clone()),
        Value::String(s) => serde_json::from_str::<Number>(s.trim()).ok(),
        Value::Bool(b) => Some(Number::from(*b as u8)),
        _ => None,
    }
}

fn write(scalar: Scalar, value: &Value, out: &mut Vec<u8>) -> Result<()> {
    let n = number(value).with_context(|| format!("{value} is not a number"))?;
    let width = scalar.width();
    match scalar {
        Scalar::U8 | Scalar::U16 | Scalar::U32 | Scalar::U64 => {
            let v = n.as_u64().context("Expected an unsigned integer")?;
            if width < 8 && v >> (width * 8) != 0 {
                bail!("{v} does not fit in {width} bytes");
            }
            out.extend_from_slice(&v.to_le_bytes()[..width]);
        }
        Scalar::I8 | Scalar::I16 | Scalar::I32 | Scalar::I64 => {
            let v = n.as_i64().context("Expected an integer")?;
            let bits = (width * 8) as u32;
            if bits < 64 && (v < -(1i64 << (bits - 1)) || v >= 1i64 << (bits - 1)) {
                bail!("{v} does not fit in {width} bytes");
            }
            out.extend_from_slice(&v.to_le_bytes()[..width]);
        }
        Scalar::F32 => {
            let v = n.as_f64().context("Expected a float")? as f32;
            out.extend_from_slice(&v.to_le_bytes());
        }
        Scalar::F64 => {
            let v = n.as_f64().context("Expected a float")?;
            out.extend_from_slice(&v.to_le_bytes());
        }
    }
    Ok(())
}
