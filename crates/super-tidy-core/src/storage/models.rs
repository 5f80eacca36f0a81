/// A file registered in the record store.
#[derive(Debug, Clone)]
pub struct ManagedFile {
    pub id: i64,
    pub canonical_path: String,
    pub file_size: i64,
    pub last_modified: i64,
}
