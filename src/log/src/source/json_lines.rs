use std::path::Path;

use common_base::iterator::AsyncIterator;
use common_base::sample::{FieldValue, Sample, REALTIME_NS};
use serde_json::{Map, Value};
use tokio::fs::File;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines};

use crate::chunk::schema::{ColumnType, Schema};

/// JsonLinesSource reads one sample per line from newline-delimited JSON
/// objects, e.g. `{"realtime_ns": 1000, "rpm": 4000, "sensor.map": 97.5}`.
///
/// Field order is the object's key order. Integers become uint32 fields and
/// numbers with a fraction or exponent become float fields; other values are
/// not numeric telemetry and are skipped.
///
/// Column kinds are fixed by the first sample: once a column is float, later
/// whole numbers such as `98` in it are read as floats. The first line must
/// therefore write float columns with a fraction (`98.0`), otherwise the
/// column is uint32 and a later `98.5` is a schema mismatch.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: usize,
    schema: Option<Schema>,
}

impl JsonLinesSource<BufReader<File>> {
    pub async fn open(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let fd = File::open(path)
            .await
            .map_err(|e| anyhow!("open: {}: {}", path.display(), e))?;
        Ok(Self::new(BufReader::new(fd)))
    }
}

impl<R> JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    pub fn new(r: R) -> Self {
        Self {
            lines: r.lines(),
            line_no: 0,
            schema: None,
        }
    }

    /// line_no returns the number of lines consumed so far.
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

#[async_trait]
impl<R> AsyncIterator for JsonLinesSource<R>
where
    R: AsyncBufRead + Unpin + Send,
{
    type Item = Sample;

    async fn try_next(&mut self) -> anyhow::Result<Option<Self::Item>> {
        loop {
            let line = match self.lines.next_line().await? {
                Some(line) => line,
                None => return Ok(None),
            };
            self.line_no += 1;

            if line.trim().is_empty() {
                continue;
            }

            let mut sample = parse_sample(self.line_no, line.as_str())?;
            match &self.schema {
                Some(schema) => widen_to_schema(schema, &mut sample),
                None => self.schema = Some(Schema::derive(&sample)),
            }

            return Ok(Some(sample));
        }
    }
}

/// widen_to_schema turns uint32 values into floats where schema has a float
/// column of the same name at that position.
fn widen_to_schema(schema: &Schema, sample: &mut Sample) {
    for ((name, value), column) in sample.fields.iter_mut().zip(schema.fields()) {
        if column.typ != ColumnType::Float || *name != column.name {
            continue;
        }
        if let FieldValue::Uint32(v) = *value {
            *value = FieldValue::Float(v as f32);
        }
    }
}

/// parse_sample converts one JSON object into a sample.
pub fn parse_sample(line_no: usize, line: &str) -> anyhow::Result<Sample> {
    let object: Map<String, Value> =
        serde_json::from_str(line).map_err(|e| anyhow!("line {}: {}", line_no, e))?;

    let mut realtime_ns = None;
    let mut fields = Vec::with_capacity(object.len());

    for (name, value) in object {
        if name == REALTIME_NS {
            let ts = value.as_u64().ok_or_else(|| {
                anyhow!(
                    "line {}: {} must be a non-negative integer, found {}",
                    line_no,
                    REALTIME_NS,
                    value
                )
            })?;
            realtime_ns = Some(ts);
            continue;
        }

        let number = match value {
            Value::Number(n) => n,
            _ => continue,
        };

        let value = if let Some(v) = number.as_u64() {
            let v = u32::try_from(v)
                .map_err(|_| anyhow!("line {}: field '{}' = {} overflows uint32", line_no, name, v))?;
            FieldValue::Uint32(v)
        } else if number.is_i64() {
            return Err(anyhow!(
                "line {}: field '{}' = {} is a negative integer",
                line_no,
                name,
                number
            ));
        } else {
            let v = number.as_f64().unwrap_or(f64::NAN);
            FieldValue::Float(v as f32)
        };

        fields.push((name, value));
    }

    let realtime_ns =
        realtime_ns.ok_or_else(|| anyhow!("line {}: missing {}", line_no, REALTIME_NS))?;

    Ok(Sample::with_fields(realtime_ns, fields))
}

#[cfg(test)]
mod tests {
    use common_base::iterator::AsyncIterator;
    use common_base::sample::{FieldValue, Sample};

    use crate::chunk::compression::Compression;
    use crate::chunk::encoder::encode_chunk;
    use crate::source::json_lines::{parse_sample, JsonLinesSource};

    #[test]
    fn test_parse_sample_keeps_column_order() {
        let s = parse_sample(
            1,
            r#"{"rpm": 4000, "realtime_ns": 1000, "sensor.map": 97.5, "ve": 80.0}"#,
        )
        .unwrap();
        assert_eq!(
            s,
            Sample::new(1000)
                .uint32("rpm", 4000)
                .float("sensor.map", 97.5)
                .float("ve", 80.0)
        );
    }

    #[test]
    fn test_parse_sample_skips_non_numeric() {
        let s = parse_sample(
            1,
            r#"{"realtime_ns": 5, "status": "ok", "armed": true, "gap": null, "rpm": 1}"#,
        )
        .unwrap();
        assert_eq!(s.fields, vec![("rpm".to_string(), FieldValue::Uint32(1))]);
    }

    #[test]
    fn test_parse_sample_errors() {
        let err = parse_sample(7, r#"{"rpm": 1}"#).unwrap_err();
        assert!(err.to_string().contains("line 7"), "{}", err);

        assert!(parse_sample(1, r#"{"realtime_ns": -1}"#).is_err());
        assert!(parse_sample(1, r#"{"realtime_ns": 1.5}"#).is_err());
        assert!(parse_sample(1, r#"{"realtime_ns": 1, "rpm": 4294967296}"#).is_err());
        assert!(parse_sample(1, r#"{"realtime_ns": 1, "rpm": -3}"#).is_err());
        assert!(parse_sample(1, r#"[1, 2]"#).is_err());
        assert!(parse_sample(1, r#"{"realtime_ns": "#).is_err());
    }

    #[tokio::test]
    async fn test_json_lines_source() {
        let input = "{\"realtime_ns\": 1, \"rpm\": 10}\n\n{\"realtime_ns\": 2, \"rpm\": 20}\n";
        let mut source = JsonLinesSource::new(input.as_bytes());

        let mut samples = vec![];
        while let Some(s) = source.try_next().await.unwrap() {
            samples.push(s);
        }
        assert_eq!(
            samples,
            vec![
                Sample::new(1).uint32("rpm", 10),
                Sample::new(2).uint32("rpm", 20)
            ]
        );
        assert_eq!(source.line_no(), 3);
    }

    #[tokio::test]
    async fn test_json_lines_source_keeps_float_columns() {
        let input = concat!(
            "{\"realtime_ns\": 1, \"rpm\": 900, \"map\": 97.5}\n",
            "{\"realtime_ns\": 2, \"rpm\": 950, \"map\": 98}\n",
            "{\"realtime_ns\": 3, \"rpm\": 1000, \"map\": 98.5}\n",
        );
        let mut source = JsonLinesSource::new(input.as_bytes());

        let mut samples = vec![];
        while let Some(s) = source.try_next().await.unwrap() {
            samples.push(s);
        }
        assert_eq!(
            samples,
            vec![
                Sample::new(1).uint32("rpm", 900).float("map", 97.5),
                Sample::new(2).uint32("rpm", 950).float("map", 98.0),
                Sample::new(3).uint32("rpm", 1000).float("map", 98.5),
            ]
        );

        let chunk = encode_chunk("feed", &samples, Compression::None)
            .await
            .unwrap();
        assert_eq!(chunk.rows, 3);
    }

    #[tokio::test]
    async fn test_json_lines_source_reports_line() {
        let input = "{\"realtime_ns\": 1}\n{\"oops\": 1}\n";
        let mut source = JsonLinesSource::new(input.as_bytes());
        assert!(source.try_next().await.unwrap().is_some());
        let err = source.try_next().await.unwrap_err();
        assert!(err.to_string().contains("line 2"), "{}", err);
    }
}
