use crate::core::models::structure::Structure;
use std::error::Error;
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

/// Defines the interface for reading coordinate file formats into a [`Structure`].
pub trait StructureFile {
    /// The error type for parse and I/O failures.
    type Error: Error + From<io::Error>;

    /// Reads a structure from a buffered reader, naming it `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if parsing fails or the reader fails.
    fn read_from(name: &str, reader: &mut impl BufRead) -> Result<Structure, Self::Error>;

    /// Reads a structure from a file path. The structure is named after the
    /// file stem.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or parsing fails.
    fn read_from_path<P: AsRef<Path>>(path: P) -> Result<Structure, Self::Error> {
        let path = path.as_ref();
        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let file = File::open(path)?;
        let mut reader = BufReader::new(file);
        Self::read_from(&name, &mut reader)
    }
}
