// File: src/persistence.rs
use crate::error::{LexiconError, Result};
use crate::index::{LexiconIndex, INDEX_SCHEMA_VERSION};
use crate::resolver::ensure_supported_schema;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

/// Leading bytes of every index file, followed by the schema version.
const INDEX_MAGIC: &[u8; 6] = b"LEXIDX";

/// Writes `write` into a temp file beside `path`, then renames it over
/// `path`, so readers never see a half-written file.
fn write_atomically<F>(path: &Path, write: F) -> Result<()>
where
    F: FnOnce(&mut BufWriter<&File>) -> Result<()>,
{
    let parent_dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent_dir)?;

    let temp_file = NamedTempFile::new_in(parent_dir)?;
    {
        let mut writer = BufWriter::new(temp_file.as_file());
        write(&mut writer)?;
        writer.flush()?;
    }
    temp_file.as_file().sync_all()?;
    temp_file.persist(path).map_err(|e| e.error)?;
    Ok(())
}

/// Saves an index as magic + schema version + bincode body.
pub fn save_index(index: &LexiconIndex, path: &Path) -> Result<()> {
    write_atomically(path, |writer| {
        writer.write_all(INDEX_MAGIC)?;
        bincode::serialize_into(&mut *writer, &INDEX_SCHEMA_VERSION)?;
        bincode::serialize_into(&mut *writer, index)?;
        Ok(())
    })?;
    info!("Saved index {} to {:?}", index.metadata().pack_id, path);
    Ok(())
}

/// Loads an index, refusing files from an unsupported schema before
/// decoding the body.
pub fn load_index(path: &Path) -> Result<LexiconIndex> {
    let mut reader = BufReader::new(File::open(path)?);

    let mut magic = [0u8; 6];
    reader.read_exact(&mut magic)?;
    if &magic != INDEX_MAGIC {
        return Err(LexiconError::DataIntegrity(format!("{:?} is not a lexicon index", path)));
    }
    let version: u32 = bincode::deserialize_from(&mut reader)?;
    ensure_supported_schema(version)?;

    let mut index: LexiconIndex = bincode::deserialize_from(&mut reader)?;
    ensure_supported_schema(index.metadata().schema_version)?;
    index.rebuild_derived();
    debug!("Loaded index {} from {:?}", index.metadata().pack_id, path);
    Ok(index)
}

/// Saves any serializable value as pretty JSON.
pub fn save_json<T: Serialize + ?Sized>(value: &T, path: &Path) -> Result<()> {
    write_atomically(path, |writer| {
        serde_json::to_writer_pretty(&mut *writer, value)?;
        Ok(())
    })
}

pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let reader = BufReader::new(File::open(path)?);
    Ok(serde_json::from_reader(reader)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::LexiconBuilder;
    use crate::config::LexiconConfig;
    use crate::core::types::LanguagePair;
    use crate::resolver::MIN_SCHEMA_VERSION;
    use tempfile::TempDir;

    fn sample_index() -> LexiconIndex {
        let source = "agua|aguas\t<i>noun</i><ol><li>water</li></ol>\n";
        LexiconBuilder::build_from_reader(LanguagePair::new("es", "en"), &LexiconConfig::default(), source.as_bytes())
            .unwrap()
            .0
    }

    #[test]
    fn index_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("packs").join("es-en.lexidx");
        let index = sample_index();

        save_index(&index, &path).unwrap();
        let loaded = load_index(&path).unwrap();

        assert_eq!(loaded.metadata(), index.metadata());
        assert_eq!(loaded.meanings(), index.meanings());
        assert_eq!(loaded.groups_with_form("AGUAS").count(), 1);
        assert_eq!(loaded.reverse_entries_for("water").len(), 1);
    }

    #[test]
    fn stale_schema_is_refused_before_decoding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("old.lexidx");
        let mut bytes = INDEX_MAGIC.to_vec();
        bytes.extend(bincode::serialize(&(MIN_SCHEMA_VERSION - 1)).unwrap());
        bytes.extend_from_slice(b"garbage body");
        fs::write(&path, bytes).unwrap();

        assert!(matches!(
            load_index(&path),
            Err(LexiconError::SchemaMismatch { found, .. }) if found == MIN_SCHEMA_VERSION - 1
        ));
    }

    #[test]
    fn foreign_files_are_refused() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("notes.txt");
        fs::write(&path, "just some text").unwrap();
        assert!(matches!(load_index(&path), Err(LexiconError::DataIntegrity(_))));
    }

    #[test]
    fn json_save_replaces_previous_contents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("values.json");
        save_json(&vec![1, 2, 3], &path).unwrap();
        save_json(&vec![4], &path).unwrap();
        let loaded: Vec<i32> = load_json(&path).unwrap();
        assert_eq!(loaded, vec![4]);
    }
}
