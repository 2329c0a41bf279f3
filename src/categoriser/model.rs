use std::fs;
use std::io::{Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use log::info;
use serde::{Deserialize, Serialize};

use crate::categoriser::ClassifierModel;

/// findash binary version, written into every artifact header.
const FINDASH_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Fixed-size artifact header: 2 bytes of metadata length, bincode
/// metadata, zero padding up to HEADER_LEN, then the model body.
const HEADER_LEN: usize = 256;

/// Metadata of a model artifact. Contains the version of findash that
/// wrote it, so a future version can upgrade artifacts written by an
/// older binary.
#[derive(Serialize, Deserialize, Debug)]
struct Metadata {
    version: String,
}

/// Write the model artifact, replacing any previous one atomically: the
/// bytes land in a sibling temp file which is then renamed over the
/// target, so readers see either the old artifact or the new one in full.
pub(crate) fn save_model(model: &ClassifierModel, path: &Path) -> anyhow::Result<()> {
    let metadata = Metadata { version: FINDASH_VERSION.to_string() };
    let metadata_encoded: Vec<u8> = bincode::serialize(&metadata)?;
    anyhow::ensure!(metadata_encoded.len() <= HEADER_LEN - 2, "model metadata too large");

    let body: Vec<u8> = bincode::serialize(model)?;

    let tmp_path = temp_sibling(path);
    let mut file = fs::File::create(&tmp_path)?;
    file.write_u16::<LittleEndian>(metadata_encoded.len() as u16)?;
    file.write_all(&metadata_encoded)?;
    file.write_all(&vec![0; HEADER_LEN - 2 - metadata_encoded.len()])?;
    file.write_all(&body)?;
    file.flush()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    info!("Saved model artifact to {}", path.display());
    Ok(())
}

/// Load a previously trained artifact. Ok(None) when none exists yet.
pub(crate) fn load_model(path: &Path) -> anyhow::Result<Option<ClassifierModel>> {
    if !path.exists() {
        return Ok(None);
    }

    let mut file = fs::File::open(path)?;
    let metadata_len = file.read_u16::<LittleEndian>()?;
    let mut buffer = vec![0; metadata_len as usize];
    file.read_exact(&mut buffer)?;
    let metadata: Metadata = bincode::deserialize(&buffer)?;
    info!("Model artifact version {}", metadata.version);

    file.seek(SeekFrom::Start(HEADER_LEN as u64))?;
    let mut body: Vec<u8> = vec![];
    file.read_to_end(&mut body)?;

    Ok(Some(bincode::deserialize(&body)?))
}

fn temp_sibling(path: &Path) -> PathBuf {
    let mut file_name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    file_name.push(".tmp");
    path.with_file_name(file_name)
}

#[cfg(test)]
mod tests {
    use std::fs;
    use std::path::PathBuf;

    use super::{load_model, save_model};
    use crate::categoriser::{train, TrainingExample};

    fn scratch_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("findash-{}-{}", std::process::id(), name))
    }

    #[test]
    fn test_artifact_round_trip() {
        let examples = vec![
            TrainingExample { description: "Starbucks Coffee".to_string(), category: "Dining".to_string() },
            TrainingExample { description: "Shell Gas".to_string(), category: "Transport".to_string() },
        ];
        let model = train(&examples).unwrap();

        let path = scratch_path("model.bin");
        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap().unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(model, loaded);
        assert_eq!(loaded.predict("Starbucks Coffee"), "Dining");
    }

    #[test]
    fn test_missing_artifact_is_none() {
        let path = scratch_path("missing-model.bin");
        assert!(load_model(&path).unwrap().is_none());
    }
}
