use crate::model::Item;
use std::fs::{self, File};
use std::io::{self, Read};

/// Byte access to managed items. Failures are per item and never fatal.
pub trait FileSource: Send + Sync {
    fn read_bytes(&self, item: &Item) -> io::Result<Vec<u8>>;

    fn size(&self, item: &Item) -> io::Result<u64>;

    /// Read at most `len` leading bytes.
    fn read_prefix(&self, item: &Item, len: usize) -> io::Result<Vec<u8>> {
        let mut data = self.read_bytes(item)?;
        data.truncate(len);
        Ok(data)
    }
}

/// Reads items straight from the local filesystem by path.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalFileSource;

impl FileSource for LocalFileSource {
    fn read_bytes(&self, item: &Item) -> io::Result<Vec<u8>> {
        let mut f = File::open(&item.path)?;
        let mut buffer = Vec::new();
        f.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    fn size(&self, item: &Item) -> io::Result<u64> {
        Ok(fs::metadata(&item.path)?.len())
    }

    fn read_prefix(&self, item: &Item, len: usize) -> io::Result<Vec<u8>> {
        let f = File::open(&item.path)?;
        let mut buffer = Vec::with_capacity(len);
        f.take(len as u64).read_to_end(&mut buffer)?;
        Ok(buffer)
    }
}
