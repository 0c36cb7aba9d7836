//! Column oriented batch of rows.
use crate::{
    Result,
    binary::{DecodeError, Deserializer, Serializer},
    common::{span, verbose},
    protocol::revision,
    types::{DataType, TypeError, TypeRegistry},
    value::Value,
};

/// Extra block metadata, sent before the columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockInfo {
    /// Block holds the rows exceeding `max_rows_to_group_by`.
    pub is_overflows: bool,
    /// Bucket of two level aggregation, `-1` if unused.
    pub bucket_num: i32,
}

impl Default for BlockInfo {
    fn default() -> Self {
        Self {
            is_overflows: false,
            bucket_num: -1,
        }
    }
}

impl BlockInfo {
    // fields are numbered, terminated by field 0
    fn serialize(&self, ser: &mut Serializer) {
        ser.write_var_uint(1);
        ser.write_u8(self.is_overflows as u8);
        ser.write_var_uint(2);
        ser.write_i32(self.bucket_num);
        ser.write_var_uint(0);
    }

    fn deserialize(de: &mut Deserializer) -> Result<BlockInfo, DecodeError> {
        let mut info = BlockInfo::default();
        loop {
            match de.read_var_uint()? {
                0 => return Ok(info),
                1 => info.is_overflows = de.read_u8()? != 0,
                2 => info.bucket_num = de.read_i32()?,
                n => return Err(DecodeError::invalid(format!("unknown block info field {n}"))),
            }
        }
    }
}

/// Named and typed column.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    name: String,
    ty: DataType,
    values: Vec<Value>,
}

impl Column {
    /// Create column, every value is coerced into `ty`.
    pub fn new(name: impl Into<String>, ty: DataType, values: Vec<Value>) -> Result<Column, TypeError> {
        let values = values
            .into_iter()
            .map(|value| ty.coerce(value))
            .collect::<Result<_, _>>()?;
        Ok(Column { name: name.into(), ty, values })
    }

    /// Create column without values.
    pub fn empty(name: impl Into<String>, ty: DataType) -> Column {
        Column { name: name.into(), ty, values: Vec::new() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn data_type(&self) -> &DataType {
        &self.ty
    }

    pub fn values(&self) -> &[Value] {
        &self.values
    }

    pub fn get(&self, row: usize) -> Option<&Value> {
        self.values.get(row)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.values
    }
}

/// Ordered set of columns with equal row count.
///
/// A block with columns but no rows describes a schema, the server sends one
/// before the data of a query and before accepting insert data.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Block {
    info: BlockInfo,
    columns: Vec<Column>,
}

impl Block {
    pub fn new() -> Block {
        Block::default()
    }

    /// Create block from columns, fails if row counts differ.
    pub fn from_columns(columns: Vec<Column>) -> Result<Block, TypeError> {
        if let Some(first) = columns.first() {
            if let Some(column) = columns.iter().find(|c| c.len() != first.len()) {
                return Err(TypeError::Length { expect: first.len(), found: column.len() });
            }
        }
        Ok(Block { info: BlockInfo::default(), columns })
    }

    pub fn info(&self) -> &BlockInfo {
        &self.info
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column(&self, index: usize) -> Option<&Column> {
        self.columns.get(index)
    }

    pub fn column_by_name(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn column_count(&self) -> usize {
        self.columns.len()
    }

    pub fn row_count(&self) -> usize {
        self.columns.first().map_or(0, Column::len)
    }

    /// Returns `true` if block contains no rows.
    pub fn is_empty(&self) -> bool {
        self.row_count() == 0
    }

    /// Values of a row, in column order.
    pub fn row(&self, index: usize) -> Option<Vec<&Value>> {
        if index >= self.row_count() {
            return None;
        }
        Some(self.columns.iter().map(|c| &c.values[index]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = Vec<&Value>> + '_ {
        (0..self.row_count()).filter_map(|i| self.row(i))
    }

    /// Discard all rows, keeping the columns, to start appending rows.
    pub fn init_write_buffer(&mut self) {
        for column in &mut self.columns {
            column.values.clear();
        }
    }

    /// Append a row, values are coerced into the column types.
    ///
    /// On error, the block is left unchanged.
    pub fn append_row(&mut self, row: Vec<Value>) -> Result<(), TypeError> {
        if row.len() != self.columns.len() {
            return Err(TypeError::Length { expect: self.columns.len(), found: row.len() });
        }
        let row = self
            .columns
            .iter()
            .zip(row)
            .map(|(column, value)| column.ty.coerce(value))
            .collect::<Result<Vec<_>, _>>()?;
        for (column, value) in self.columns.iter_mut().zip(row) {
            column.values.push(value);
        }
        Ok(())
    }

    /// Create block with the columns of `sample`, taking values from this block.
    ///
    /// Columns are matched by name, falling back to position.
    pub fn cast_to(&self, sample: &Block) -> Result<Block, TypeError> {
        let columns = sample
            .columns
            .iter()
            .enumerate()
            .map(|(i, target)| {
                let source = self
                    .column_by_name(&target.name)
                    .or_else(|| self.columns.get(i))
                    .ok_or(TypeError::Length { expect: sample.columns.len(), found: self.columns.len() })?;
                Column::new(target.name.clone(), target.ty.clone(), source.values.clone())
            })
            .collect::<Result<_, _>>()?;
        Block::from_columns(columns)
    }

    /// Write block, `revision` is the negotiated protocol revision.
    pub fn serialize(&self, ser: &mut Serializer, revision: u64) -> Result<(), TypeError> {
        if revision >= revision::BLOCK_INFO {
            self.info.serialize(ser);
        }
        ser.write_var_uint(self.columns.len() as u64);
        ser.write_var_uint(self.row_count() as u64);
        for column in &self.columns {
            ser.write_string(&column.name);
            ser.write_string(&column.ty.to_string());
            column.ty.serialize_bulk(&column.values, ser)?;
        }
        Ok(())
    }

    /// Read block, `revision` is the negotiated protocol revision.
    pub fn deserialize(de: &mut Deserializer, registry: &TypeRegistry, revision: u64) -> Result<Block> {
        span!("block");
        let info = match revision >= revision::BLOCK_INFO {
            true => BlockInfo::deserialize(de)?,
            false => BlockInfo::default(),
        };
        let column_count = read_count(de)?;
        let row_count = read_count(de)?;
        verbose!("Block: {column_count} columns, {row_count} rows");

        let mut columns = Vec::with_capacity(column_count.min(1024));
        for _ in 0..column_count {
            let name = de.read_string()?;
            let ty = registry.get(&de.read_string()?)?;
            let values = ty.deserialize_bulk(row_count, de)?;
            columns.push(Column { name, ty, values });
        }

        Ok(Block { info, columns })
    }
}

fn read_count(de: &mut Deserializer) -> Result<usize, DecodeError> {
    usize::try_from(de.read_var_uint()?).map_err(|_| DecodeError::invalid("count overflow"))
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::protocol::revision::CLIENT;

    fn sample() -> Block {
        Block::from_columns(vec![
            Column::empty("id", DataType::UInt32),
            Column::empty("name", DataType::Nullable(Box::new(DataType::String))),
        ])
        .unwrap()
    }

    #[test]
    fn append_rows() {
        let mut block = sample();
        block.init_write_buffer();
        block.append_row(vec![Value::Int32(1), Value::String("a".into())]).unwrap();
        block.append_row(vec![Value::UInt32(2), Value::Null]).unwrap();

        assert!(matches!(
            block.append_row(vec![Value::Int32(-1), Value::Null]),
            Err(TypeError::Mismatch { .. })
        ));
        assert!(matches!(
            block.append_row(vec![Value::Int32(3)]),
            Err(TypeError::Length { expect: 2, found: 1 })
        ));

        assert_eq!(block.row_count(), 2);
        assert_eq!(block.column_by_name("id").unwrap().values(), &[Value::UInt32(1), Value::UInt32(2)]);
        assert_eq!(block.row(1).unwrap(), vec![&Value::UInt32(2), &Value::Null]);
        assert!(block.row(2).is_none());

        block.init_write_buffer();
        assert!(block.is_empty());
        assert_eq!(block.column_count(), 2);
    }

    #[test]
    fn unequal_columns() {
        let result = Block::from_columns(vec![
            Column::new("a", DataType::Int8, vec![Value::Int8(1)]).unwrap(),
            Column::empty("b", DataType::Int8),
        ]);
        assert!(matches!(result, Err(TypeError::Length { expect: 1, found: 0 })));
    }

    #[test]
    fn wire_round_trip() {
        let mut block = sample();
        block.append_row(vec![Value::UInt32(7), Value::String("x".into())]).unwrap();
        block.append_row(vec![Value::UInt32(8), Value::Null]).unwrap();

        let mut ser = Serializer::new(None);
        block.serialize(&mut ser, CLIENT).unwrap();
        let raw = ser.output().to_vec();

        // block info: field 1, is_overflows, field 2, bucket_num, end
        assert_eq!(&raw[..8], &[1, 0, 2, 0xff, 0xff, 0xff, 0xff, 0]);
        assert_eq!(&raw[8..10], &[2, 2]);

        let mut de = Deserializer::new(&raw, false);
        let decoded = Block::deserialize(&mut de, &TypeRegistry::new(), CLIENT).unwrap();
        assert_eq!(decoded, block);
        assert_eq!(de.consumed(), raw.len());
    }

    #[test]
    fn old_revision_has_no_block_info() {
        let mut ser = Serializer::new(None);
        sample().serialize(&mut ser, revision::BLOCK_INFO - 1).unwrap();
        assert_eq!(ser.output()[..2], [2, 0]);
    }

    #[test]
    fn cast_to_sample() {
        let block = Block::from_columns(vec![
            Column::new("name", DataType::String, vec![Value::from("a")]).unwrap(),
            Column::new("id", DataType::Int64, vec![Value::Int64(5)]).unwrap(),
        ])
        .unwrap();

        let cast = block.cast_to(&sample()).unwrap();
        assert_eq!(cast.column(0).unwrap().name(), "id");
        assert_eq!(cast.column(0).unwrap().values(), &[Value::UInt32(5)]);
        assert_eq!(cast.column(1).unwrap().data_type(), &DataType::Nullable(Box::new(DataType::String)));

        let short = Block::from_columns(vec![Column::empty("other", DataType::Int8)]).unwrap();
        assert!(short.cast_to(&sample()).is_err());
    }
}
