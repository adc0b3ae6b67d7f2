//! Lecture des archives de ROMs
//!
//! Le chargeur parcourt une archive deux fois (identification puis
//! chargement); les lecteurs sont donc indexés et relisibles depuis le début.

use std::fs::File;
use std::io::{BufReader, Read, Seek};
use std::path::{Path, PathBuf};

use walkdir::WalkDir;
use zip::ZipArchive;

use super::error::RomError;
use super::validation::calculate_crc32;

/// Métadonnées d'une entrée d'archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    pub name: String,

    /// CRC32 déclaré par l'archive
    pub crc32: u32,

    /// Taille décompressée
    pub size: u64,
}

/// Résultat d'une extraction réussie
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStatus {
    /// Le CRC des octets lus correspond à celui déclaré
    Verified,

    /// Les octets ont été lus mais leur CRC diffère de celui déclaré
    ChecksumMismatch { expected: u32, found: u32 },
}

/// Lecteur d'archive consommé par le chargeur de ROM sets
pub trait RomArchive {
    /// Chemin ou nom de l'archive, pour les messages
    fn source(&self) -> &str;

    /// Nombre d'entrées
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lit les métadonnées de l'entrée `index`
    fn entry(&mut self, index: usize) -> Result<ArchiveEntry, RomError>;

    /// Extrait exactement `buf.len()` octets de l'entrée `index`
    fn read_entry(&mut self, index: usize, buf: &mut [u8]) -> Result<ReadStatus, RomError>;
}

/// Types d'archives supportés
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    /// Archive ZIP
    Zip,

    /// Répertoire de fichiers non compressés
    Directory,
}

impl ArchiveKind {
    /// Détecte le type d'archive d'un chemin
    pub fn detect(path: &Path) -> Self {
        if path.is_dir() {
            ArchiveKind::Directory
        } else {
            ArchiveKind::Zip
        }
    }
}

/// Ouvre une archive selon son type
pub fn open_archive(path: &Path) -> Result<Box<dyn RomArchive>, RomError> {
    match ArchiveKind::detect(path) {
        ArchiveKind::Zip => Ok(Box::new(ZipRomArchive::open(path)?)),
        ArchiveKind::Directory => Ok(Box::new(DirectoryRomArchive::open(path)?)),
    }
}

fn checked(expected: u32, data: &[u8]) -> ReadStatus {
    let found = calculate_crc32(data);
    if found == expected {
        ReadStatus::Verified
    } else {
        ReadStatus::ChecksumMismatch { expected, found }
    }
}

/// Archive ZIP
pub struct ZipRomArchive<R: Read + Seek> {
    path: String,
    archive: ZipArchive<R>,
}

impl ZipRomArchive<BufReader<File>> {
    /// Ouvre une archive ZIP sur disque
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let display = path.as_ref().display().to_string();
        let file = File::open(path.as_ref()).map_err(|e| RomError::ArchiveOpen {
            path: display.clone(),
            reason: e.to_string(),
        })?;
        Self::from_reader(display, BufReader::new(file))
    }
}

impl<R: Read + Seek> ZipRomArchive<R> {
    /// Lit le répertoire central depuis n'importe quelle source
    pub fn from_reader(path: impl Into<String>, reader: R) -> Result<Self, RomError> {
        let path = path.into();
        let archive = ZipArchive::new(reader).map_err(|e| RomError::ArchiveOpen {
            path: path.clone(),
            reason: e.to_string(),
        })?;
        Ok(Self { path, archive })
    }
}

impl<R: Read + Seek> RomArchive for ZipRomArchive<R> {
    fn source(&self) -> &str {
        &self.path
    }

    fn len(&self) -> usize {
        self.archive.len()
    }

    fn entry(&mut self, index: usize) -> Result<ArchiveEntry, RomError> {
        let path = &self.path;
        let file = self.archive.by_index(index).map_err(|e| RomError::EntryInfo {
            path: path.clone(),
            index,
            reason: e.to_string(),
        })?;

        if file.is_dir() {
            return Err(RomError::EntryInfo {
                path: path.clone(),
                index,
                reason: format!("{} est un répertoire", file.name()),
            });
        }

        Ok(ArchiveEntry {
            name: file.name().to_string(),
            crc32: file.crc32(),
            size: file.size(),
        })
    }

    fn read_entry(&mut self, index: usize, buf: &mut [u8]) -> Result<ReadStatus, RomError> {
        let path = &self.path;
        let mut file = self.archive.by_index(index).map_err(|e| RomError::Extract {
            file: format!("#{}", index),
            path: path.clone(),
            reason: e.to_string(),
        })?;

        if file.size() != buf.len() as u64 {
            return Err(RomError::SizeMismatch {
                file: file.name().to_string(),
                path: path.clone(),
                expected: buf.len(),
                found: file.size(),
            });
        }

        // Lecture exacte: le contrôle CRC de zip ne se déclenche qu'en fin de flux,
        // on le refait nous-mêmes pour distinguer corruption et échec de lecture
        file.read_exact(buf).map_err(|e| RomError::Extract {
            file: file.name().to_string(),
            path: path.clone(),
            reason: e.to_string(),
        })?;

        Ok(checked(file.crc32(), buf))
    }
}

/// Répertoire de fichiers ROM non compressés
pub struct DirectoryRomArchive {
    root: String,
    files: Vec<PathBuf>,

    /// (taille, CRC) calculés au premier accès à chaque entrée
    metadata: Vec<Option<(u64, u32)>>,
}

/// Calcule taille et CRC d'un fichier par blocs, sans le charger en entier
fn scan_file(path: &Path) -> std::io::Result<(u64, u32)> {
    let mut reader = BufReader::new(File::open(path)?);
    let mut hasher = crc32fast::Hasher::new();
    let mut chunk = [0u8; 64 * 1024];
    let mut size = 0u64;
    loop {
        let read = reader.read(&mut chunk)?;
        if read == 0 {
            break;
        }
        hasher.update(&chunk[..read]);
        size += read as u64;
    }
    Ok((size, hasher.finalize()))
}

impl DirectoryRomArchive {
    /// Liste les fichiers du répertoire, triés par nom
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, RomError> {
        let root = path.as_ref().display().to_string();
        if !path.as_ref().is_dir() {
            return Err(RomError::ArchiveOpen {
                path: root,
                reason: "pas un répertoire".to_string(),
            });
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(path.as_ref())
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
        {
            let entry = entry.map_err(|e| RomError::ArchiveOpen {
                path: root.clone(),
                reason: e.to_string(),
            })?;
            if entry.file_type().is_file() {
                files.push(entry.into_path());
            }
        }

        let metadata = vec![None; files.len()];
        Ok(Self { root, files, metadata })
    }

    fn file_name(&self, index: usize) -> String {
        self.files[index]
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default()
    }

    fn path(&self, index: usize) -> Result<&Path, String> {
        self.files
            .get(index)
            .map(PathBuf::as_path)
            .ok_or_else(|| format!("entrée #{} inexistante", index))
    }
}

impl RomArchive for DirectoryRomArchive {
    fn source(&self) -> &str {
        &self.root
    }

    fn len(&self) -> usize {
        self.files.len()
    }

    fn entry(&mut self, index: usize) -> Result<ArchiveEntry, RomError> {
        let entry_info = |reason: String| RomError::EntryInfo {
            path: self.root.clone(),
            index,
            reason,
        };

        let (size, crc32) = match self.metadata.get(index).copied().flatten() {
            Some(cached) => cached,
            None => {
                let path = self.path(index).map_err(entry_info)?;
                let scanned = scan_file(path).map_err(|e| entry_info(e.to_string()))?;
                self.metadata[index] = Some(scanned);
                scanned
            }
        };

        Ok(ArchiveEntry {
            name: self.file_name(index),
            crc32,
            size,
        })
    }

    fn read_entry(&mut self, index: usize, buf: &mut [u8]) -> Result<ReadStatus, RomError> {
        let extract = |reason: String| RomError::Extract {
            file: format!("#{}", index),
            path: self.root.clone(),
            reason,
        };

        let path = self.path(index).map_err(extract)?;
        let mut file = File::open(path).map_err(|e| extract(e.to_string()))?;
        let found = file.metadata().map_err(|e| extract(e.to_string()))?.len();
        if found != buf.len() as u64 {
            return Err(RomError::SizeMismatch {
                file: self.file_name(index),
                path: self.root.clone(),
                expected: buf.len(),
                found,
            });
        }
        file.read_exact(buf).map_err(|e| extract(e.to_string()))?;

        // Le fichier a pu changer depuis la lecture des métadonnées
        match self.metadata[index] {
            Some((_, expected)) => Ok(checked(expected, buf)),
            None => Ok(ReadStatus::Verified),
        }
    }
}

struct MemoryEntry {
    name: String,
    data: Vec<u8>,
    crc32: u32,
    readable: bool,
    extractable: bool,
}

/// Archive en mémoire
///
/// Permet de fournir des fichiers déjà extraits, ou de simuler des entrées
/// corrompues ou illisibles.
pub struct MemoryRomArchive {
    name: String,
    entries: Vec<MemoryEntry>,
    reads: usize,
}

impl MemoryRomArchive {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: Vec::new(),
            reads: 0,
        }
    }

    /// Ajoute un fichier dont le CRC déclaré est calculé
    pub fn with_file(self, name: &str, data: Vec<u8>) -> Self {
        let crc32 = calculate_crc32(&data);
        self.with_declared_crc(name, data, crc32)
    }

    /// Ajoute un fichier avec un CRC déclaré arbitraire
    pub fn with_declared_crc(mut self, name: &str, data: Vec<u8>, crc32: u32) -> Self {
        self.entries.push(MemoryEntry {
            name: name.to_string(),
            data,
            crc32,
            readable: true,
            extractable: true,
        });
        self
    }

    /// Ajoute une entrée dont les métadonnées sont illisibles
    pub fn with_unreadable_entry(mut self, name: &str) -> Self {
        self.entries.push(MemoryEntry {
            name: name.to_string(),
            data: Vec::new(),
            crc32: 0,
            readable: false,
            extractable: false,
        });
        self
    }

    /// Ajoute un fichier lisible dans l'annuaire mais dont l'extraction échoue
    pub fn with_unextractable_file(mut self, name: &str, data: Vec<u8>) -> Self {
        self.entries.push(MemoryEntry {
            name: name.to_string(),
            crc32: calculate_crc32(&data),
            data,
            readable: true,
            extractable: false,
        });
        self
    }

    /// Nombre d'extractions effectuées
    pub fn read_count(&self) -> usize {
        self.reads
    }
}

impl RomArchive for MemoryRomArchive {
    fn source(&self) -> &str {
        &self.name
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn entry(&mut self, index: usize) -> Result<ArchiveEntry, RomError> {
        match self.entries.get(index) {
            Some(entry) if entry.readable => Ok(ArchiveEntry {
                name: entry.name.clone(),
                crc32: entry.crc32,
                size: entry.data.len() as u64,
            }),
            Some(entry) => Err(RomError::EntryInfo {
                path: self.name.clone(),
                index,
                reason: format!("en-tête de {} illisible", entry.name),
            }),
            None => Err(RomError::EntryInfo {
                path: self.name.clone(),
                index,
                reason: "entrée inexistante".to_string(),
            }),
        }
    }

    fn read_entry(&mut self, index: usize, buf: &mut [u8]) -> Result<ReadStatus, RomError> {
        self.reads += 1;
        let entry = match self.entries.get(index) {
            Some(entry) if entry.extractable => entry,
            _ => {
                return Err(RomError::Extract {
                    file: format!("#{}", index),
                    path: self.name.clone(),
                    reason: "entrée illisible".to_string(),
                })
            }
        };

        if entry.data.len() != buf.len() {
            return Err(RomError::SizeMismatch {
                file: entry.name.clone(),
                path: self.name.clone(),
                expected: buf.len(),
                found: entry.data.len() as u64,
            });
        }
        buf.copy_from_slice(&entry.data);
        Ok(checked(entry.crc32, buf))
    }
}
