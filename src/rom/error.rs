//! Erreurs du chargement de ROM sets
//!
//! Chaque erreur est journalisée là où elle est détectée, puis repliée par le
//! chargeur en un seul résultat pour toute l'opération.

use thiserror::Error;

/// Erreurs du chargement d'un ROM set
#[derive(Debug, Error)]
pub enum RomError {
    /// L'archive ne peut pas être ouverte ou son répertoire lu
    #[error("Impossible d'ouvrir {path}: {reason}")]
    ArchiveOpen { path: String, reason: String },

    /// Les métadonnées d'une entrée sont illisibles (entrée ignorée)
    #[error("Entrée #{index} de {path} illisible: {reason}")]
    EntryInfo {
        path: String,
        index: usize,
        reason: String,
    },

    /// Échec de la décompression d'une entrée reconnue (fatal)
    #[error("Impossible de lire {file} depuis {path}: {reason}")]
    Extract {
        file: String,
        path: String,
        reason: String,
    },

    #[error("{file} dans {path} n'a pas la bonne taille (attendu {expected} octets, trouvé {found})")]
    SizeMismatch {
        file: String,
        path: String,
        expected: usize,
        found: u64,
    },

    /// Image fournie au placement d'une taille différente du descripteur
    #[error("{file}: image de {found} octets pour la région \"{region}\" (attendu {expected})")]
    ImageSizeMismatch {
        file: String,
        region: String,
        expected: usize,
        found: usize,
    },

    /// CRC recalculé à l'extraction différent de celui de l'archive
    #[error("Erreur CRC en lisant {file} depuis {path} (attendu {expected:08X}, calculé {found:08X}). Fichier peut-être corrompu.")]
    ChecksumMismatch {
        file: String,
        path: String,
        expected: u32,
        found: u32,
    },

    #[error("Aucun mapping pour la région \"{region}\" ({file})")]
    UnmappedRegion { region: String, file: String },

    /// L'écriture déborderait du buffer de la région
    #[error("{file} déborde de la région \"{region}\" ({end} > {capacity} octets)")]
    RegionOverflow {
        region: String,
        file: String,
        end: usize,
        capacity: usize,
    },

    #[error("{path} ne contient aucun jeu supporté")]
    NoSupportedGame { path: String },

    #[error("{file} (CRC={crc:08X}) est absent de {path}")]
    MissingRom { file: String, crc: u32, path: String },

    #[error("ROM set incomplet pour \"{game}\" dans {path}: {missing} fichier(s) manquant(s)")]
    IncompleteSet {
        game: String,
        path: String,
        missing: usize,
    },

    #[error("Échec du chargement de {file} (CRC={crc:08X}) depuis {path}")]
    NotLoaded { file: String, crc: u32, path: String },

    #[error("Chargement incomplet de \"{game}\" depuis {path}: {failed} fichier(s) non chargé(s)")]
    LoadIncomplete {
        game: String,
        path: String,
        failed: usize,
    },

    #[error("Mémoire insuffisante pour charger les ROMs ({size} octets)")]
    OutOfMemory { size: usize },

    #[error("Descripteur invalide pour {file} ({game}): {reason}")]
    InvalidDescriptor {
        game: String,
        file: String,
        reason: String,
    },

    #[error("Jeu \"{0}\" présent plusieurs fois dans le catalogue")]
    DuplicateGame(String),

    #[error("Région \"{0}\" déclarée plusieurs fois")]
    DuplicateRegion(String),
}

impl RomError {
    /// Journalise l'erreur sur le canal d'erreur et la renvoie
    pub fn logged(self) -> Self {
        log::error!("{}", self);
        self
    }

    /// Erreur propre à un fichier (n'interrompt pas le chargement)
    pub fn is_per_file(&self) -> bool {
        matches!(
            self,
            RomError::EntryInfo { .. }
                | RomError::SizeMismatch { .. }
                | RomError::ImageSizeMismatch { .. }
                | RomError::ChecksumMismatch { .. }
                | RomError::UnmappedRegion { .. }
                | RomError::RegionOverflow { .. }
        )
    }
}
