//! Catalogue des jeux SEGA Model 3
//!
//! Chaque jeu liste ses ROMs dans un ordre fixe: la position d'une ROM dans
//! `GameInfo::roms` est l'index stable utilisé pour vérifier qu'un ROM set est
//! complet.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};

use super::error::RomError;

/// Informations sur un jeu supporté
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GameInfo {
    /// Identifiant court (nom de l'archive, ex: "scud")
    pub id: String,

    /// Titre affiché
    pub title: String,

    /// Fabricant
    #[serde(default)]
    pub manufacturer: String,

    /// Année de sortie
    #[serde(default)]
    pub year: u16,

    /// ROMs constituant le jeu, dans l'ordre du catalogue
    pub roms: Vec<RomInfo>,

    /// Régions à remplir par miroir une fois le chargement terminé
    #[serde(default)]
    pub mirrors: Vec<RegionMirror>,
}

/// Descripteur d'une ROM attendue dans l'archive
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RomInfo {
    /// Région logique de destination
    pub region: String,

    /// Nom du fichier (affichage uniquement)
    pub file: String,

    /// Checksum CRC32 attendu
    pub crc32: u32,

    /// Taille exacte en octets
    pub size: usize,

    /// Octets copiés d'un bloc à chaque pas
    pub group_size: usize,

    /// Avance de la destination à chaque pas
    pub stride: usize,

    /// Offset dans le buffer de la région
    #[serde(default)]
    pub offset: usize,

    /// Inverse chaque paire d'octets au chargement
    #[serde(default)]
    pub byte_swap: bool,
}

/// Région répétée en miroir à partir de son début
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegionMirror {
    pub region: String,

    /// Taille de l'image répétée
    pub image_size: usize,
}

impl RomInfo {
    /// Crée un descripteur de copie contiguë à l'offset 0
    pub fn new(region: &str, file: &str, crc32: u32, size: usize) -> Self {
        let group_size = size.max(1);
        Self {
            region: region.to_string(),
            file: file.to_string(),
            crc32,
            size,
            group_size,
            stride: group_size,
            offset: 0,
            byte_swap: false,
        }
    }

    /// Copie entrelacée: `group_size` octets tous les `stride` octets
    pub fn interleaved(mut self, group_size: usize, stride: usize) -> Self {
        self.group_size = group_size;
        self.stride = stride;
        self
    }

    pub fn at_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    pub fn byte_swapped(mut self) -> Self {
        self.byte_swap = true;
        self
    }

    /// Nombre de blocs copiés
    pub fn group_count(&self) -> usize {
        if self.group_size == 0 {
            0
        } else {
            self.size / self.group_size
        }
    }

    /// Fin (exclusive) de la dernière écriture dans la région, ou `None` si
    /// elle dépasse l'espace adressable
    pub fn checked_destination_end(&self) -> Option<usize> {
        match self.group_count() {
            0 => Some(self.offset),
            n => (n - 1)
                .checked_mul(self.stride)?
                .checked_add(self.group_size)?
                .checked_add(self.offset),
        }
    }

    /// Fin (exclusive) de la dernière écriture dans la région, saturée à
    /// `usize::MAX`
    pub fn destination_end(&self) -> usize {
        self.checked_destination_end().unwrap_or(usize::MAX)
    }

    /// Vérifie la cohérence des paramètres de placement
    fn check(&self) -> Result<(), String> {
        if self.group_size == 0 {
            return Err("group_size nul".to_string());
        }
        if self.stride < self.group_size {
            return Err(format!(
                "stride ({}) inférieur à group_size ({})",
                self.stride, self.group_size
            ));
        }
        if self.size % self.group_size != 0 {
            return Err(format!(
                "taille ({}) non multiple de group_size ({})",
                self.size, self.group_size
            ));
        }
        if self.byte_swap && self.size % 2 != 0 {
            return Err(format!("taille impaire ({}) avec byte_swap", self.size));
        }
        if self.checked_destination_end().is_none() {
            return Err(format!(
                "fin de placement hors de l'espace adressable (offset {}, stride {})",
                self.offset, self.stride
            ));
        }
        Ok(())
    }
}

impl GameInfo {
    /// Taille de la plus grande ROM du jeu
    pub fn largest_rom_size(&self) -> usize {
        self.roms.iter().map(|rom| rom.size).max().unwrap_or(0)
    }

    /// Taille minimale de chaque région pour recevoir toutes les ROMs du jeu
    pub fn region_sizes(&self) -> BTreeMap<String, usize> {
        let mut sizes = BTreeMap::new();
        for rom in &self.roms {
            let size = sizes.entry(rom.region.clone()).or_insert(0);
            *size = (*size).max(rom.destination_end());
        }
        for mirror in &self.mirrors {
            let size = sizes.entry(mirror.region.clone()).or_insert(0);
            *size = (*size).max(mirror.image_size);
        }
        sizes
    }

    fn validate(&self) -> Result<(), RomError> {
        for rom in &self.roms {
            rom.check().map_err(|reason| RomError::InvalidDescriptor {
                game: self.id.clone(),
                file: rom.file.clone(),
                reason,
            })?;
        }
        Ok(())
    }
}

/// Catalogue ordonné des jeux supportés
#[derive(Debug, Clone, Default)]
pub struct GameCatalog {
    games: Vec<GameInfo>,
}

impl GameCatalog {
    /// Construit un catalogue après validation de chaque descripteur
    pub fn new(games: Vec<GameInfo>) -> Result<Self, RomError> {
        let mut ids = HashSet::new();
        for game in &games {
            if !ids.insert(game.id.as_str()) {
                return Err(RomError::DuplicateGame(game.id.clone()));
            }
            game.validate()?;
        }
        Ok(Self { games })
    }

    /// Charge le catalogue depuis un fichier JSON
    pub fn load_from_file(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let games: Vec<GameInfo> = serde_json::from_str(&content)?;
        Ok(Self::new(games)?)
    }

    /// Sauvegarde le catalogue dans un fichier JSON
    pub fn save_to_file(&self, path: &str) -> anyhow::Result<()> {
        let content = serde_json::to_string_pretty(&self.games)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn games(&self) -> &[GameInfo] {
        &self.games
    }

    pub fn get(&self, index: usize) -> Option<&GameInfo> {
        self.games.get(index)
    }

    pub fn len(&self) -> usize {
        self.games.len()
    }

    pub fn is_empty(&self) -> bool {
        self.games.is_empty()
    }

    /// Trouve un jeu par identifiant
    pub fn find_game(&self, id: &str) -> Option<&GameInfo> {
        self.games.iter().find(|game| game.id == id)
    }
}
