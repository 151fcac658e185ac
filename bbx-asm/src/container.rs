//! On-disk container format of an assembled program.
//!
//! ```text
//! [3 bytes]  magic b"BBX"
//! [1 byte]   data entry count
//! [4 bytes]  data table size, little-endian
//! [N bytes]  data table
//! [...]      code to end of file
//! ```
//!
//! Absolute addresses embedded in branch and call operands are byte
//! offsets into the whole container, header included, so `pc := addr`
//! lands exactly on the designated instruction.

use thiserror::Error;

/// First three bytes of every valid container.
pub const MAGIC: [u8; 3] = *b"BBX";

/// Magic, data count byte and the 32-bit data-table size field.
pub const FIXED_HEADER_SIZE: usize = MAGIC.len() + 1 + 4;

/// Errors surfaced while loading a container, before any instruction
/// executes.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainerError {
    /// The first three bytes do not match [`MAGIC`].
    #[error("bad magic: not a BlackBox container")]
    BadMagic,
    /// The file ends before the fixed header does.
    #[error("truncated container: {0} bytes")]
    Truncated(usize),
    /// The declared data-table size extends past the end of the file.
    #[error("data table of {declared} bytes exceeds file of {available} bytes")]
    DataTableOverrun {
        /// Declared data-table size.
        declared: u32,
        /// Bytes present after the fixed header.
        available: usize,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
/// Parsed fixed header of a container.
pub struct ContainerHeader {
    /// Number of data-table entries.
    pub data_count: u8,
    /// Size of the data table in bytes.
    pub data_size: u32,
}

impl ContainerHeader {
    /// Parse and validate the fixed header of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<Self, ContainerError> {
        if bytes.len() < FIXED_HEADER_SIZE {
            return Err(ContainerError::Truncated(bytes.len()));
        }
        if bytes[..MAGIC.len()] != MAGIC {
            return Err(ContainerError::BadMagic);
        }

        let data_count = bytes[3];
        let data_size = u32::from_le_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

        let available = bytes.len() - FIXED_HEADER_SIZE;
        if data_size as usize > available {
            return Err(ContainerError::DataTableOverrun {
                declared: data_size,
                available,
            });
        }

        Ok(Self { data_count, data_size })
    }

    /// Offset of the first code byte.
    pub const fn code_base(&self) -> usize {
        FIXED_HEADER_SIZE + self.data_size as usize
    }

    /// Serialize the fixed header into `buf`.
    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&MAGIC);
        buf.push(self.data_count);
        buf.extend_from_slice(&self.data_size.to_le_bytes());
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
/// Width class of a data-table entry.
pub enum DataKind {
    /// Null-terminated string.
    Str,
    /// 8-bit integer.
    Byte,
    /// 16-bit integer.
    Word,
    /// 32-bit integer.
    Dword,
    /// 64-bit integer.
    Qword,
}

impl DataKind {
    /// Serialized width of an integer entry; strings are variable.
    pub const fn width(&self) -> Option<usize> {
        match self {
            Self::Str => None,
            Self::Byte => Some(1),
            Self::Word => Some(2),
            Self::Dword => Some(4),
            Self::Qword => Some(8),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// One row of the data table: a named constant serialized at a fixed
/// offset. Entries are created by the assembler's layout pass and never
/// mutated afterwards.
pub struct DataEntry {
    name: String,
    kind: DataKind,
    offset: u32,
}

impl DataEntry {
    /// Entry name, unique within the table.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Width class of the entry.
    pub const fn kind(&self) -> DataKind {
        self.kind
    }

    /// Byte offset of the entry within the data table.
    pub const fn offset(&self) -> u32 {
        self.offset
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
/// The data table under construction: entry metadata plus the serialized
/// payload bytes in declaration order.
pub struct DataTable {
    entries: Vec<DataEntry>,
    bytes: Vec<u8>,
}

impl DataTable {
    /// Append a string entry; the payload is stored null-terminated.
    ///
    /// Returns the entry's offset within the table.
    pub fn push_str(&mut self, name: &str, value: &[u8]) -> Option<u32> {
        let offset = self.push_entry(name, DataKind::Str)?;
        self.bytes.extend_from_slice(value);
        self.bytes.push(0);
        Some(offset)
    }

    /// Append an integer entry serialized little-endian at the kind's
    /// natural width.
    pub fn push_int(&mut self, name: &str, kind: DataKind, value: i64) -> Option<u32> {
        let width = kind.width()?;
        let offset = self.push_entry(name, kind)?;
        self.bytes.extend_from_slice(&value.to_le_bytes()[..width]);
        Some(offset)
    }

    fn push_entry(&mut self, name: &str, kind: DataKind) -> Option<u32> {
        if self.entries.len() >= u8::MAX as usize || self.offset_of(name).is_some() {
            return None;
        }

        let offset = self.bytes.len() as u32;
        self.entries.push(DataEntry {
            name: name.to_owned(),
            kind,
            offset,
        });

        Some(offset)
    }

    /// Offset of the named entry, if declared.
    pub fn offset_of(&self, name: &str) -> Option<u32> {
        self.entries.iter().find(|e| e.name == name).map(|e| e.offset)
    }

    /// Declared entries in order.
    pub fn entries(&self) -> &[DataEntry] {
        self.entries.as_slice()
    }

    /// Number of declared entries.
    pub fn count(&self) -> u8 {
        self.entries.len() as u8
    }

    /// Serialized table size in bytes.
    pub fn size(&self) -> u32 {
        self.bytes.len() as u32
    }

    /// Serialized payload of the whole table.
    pub fn bytes(&self) -> &[u8] {
        self.bytes.as_slice()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_round_trip() {
        let header = ContainerHeader {
            data_count: 2,
            data_size: 7,
        };

        let mut buf = Vec::new();
        header.write(&mut buf);
        buf.extend_from_slice(&[0; 7]);

        assert_eq!(buf.len(), FIXED_HEADER_SIZE + 7);
        assert_eq!(ContainerHeader::parse(&buf), Ok(header));
        assert_eq!(header.code_base(), 15);
    }

    #[test]
    fn rejects_bad_magic_and_truncation() {
        assert_eq!(ContainerHeader::parse(b"BB"), Err(ContainerError::Truncated(2)));
        assert_eq!(
            ContainerHeader::parse(b"ELF\x00\x00\x00\x00\x00"),
            Err(ContainerError::BadMagic)
        );
        assert_eq!(
            ContainerHeader::parse(b"BBX\x00\xff\x00\x00\x00"),
            Err(ContainerError::DataTableOverrun {
                declared: 255,
                available: 0
            })
        );
    }

    #[test]
    fn data_table_layout() {
        let mut table = DataTable::default();

        assert_eq!(table.push_str("msg", b"abc"), Some(0));
        assert_eq!(table.push_int("n", DataKind::Word, 0x0102), Some(4));
        assert_eq!(table.push_int("big", DataKind::Qword, -1), Some(6));

        assert_eq!(table.count(), 3);
        assert_eq!(table.size(), 14);
        assert_eq!(&table.bytes()[..4], b"abc\x00");
        assert_eq!(&table.bytes()[4..6], &[0x02, 0x01]);
        assert_eq!(&table.bytes()[6..], &[0xff; 8]);

        assert_eq!(table.offset_of("n"), Some(4));
        assert_eq!(table.offset_of("missing"), None);

        // duplicate names are rejected
        assert_eq!(table.push_str("msg", b"again"), None);
    }
}
