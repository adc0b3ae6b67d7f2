//! Identification des ROMs par checksum

use crc32fast::Hasher;

use super::database::{GameCatalog, GameInfo};

/// ROM du catalogue correspondant à un checksum
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RomMatch {
    /// Index du jeu dans le catalogue
    pub game: usize,

    /// Index de la ROM dans `GameInfo::roms`
    pub rom: usize,
}

/// Calcule le CRC32 d'un buffer
pub fn calculate_crc32(data: &[u8]) -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(data);
    hasher.finalize()
}

/// Cherche une ROM par CRC dans un seul jeu
fn find_rom_in_game(game: &GameInfo, crc: u32) -> Option<usize> {
    game.roms.iter().position(|rom| rom.crc32 == crc)
}

/// Cherche une ROM par CRC dans tout le catalogue.
///
/// Le jeu `preferred` est examiné en premier; sinon le catalogue est parcouru
/// dans l'ordre et la première correspondance l'emporte, ce qui rend la
/// résolution des collisions de CRC entre jeux déterministe.
pub fn find_rom_by_crc(catalog: &GameCatalog, preferred: Option<usize>, crc: u32) -> Option<RomMatch> {
    if let Some(game) = preferred {
        if let Some(rom) = catalog.get(game).and_then(|info| find_rom_in_game(info, crc)) {
            return Some(RomMatch { game, rom });
        }
    }

    catalog
        .games()
        .iter()
        .enumerate()
        .find_map(|(game, info)| find_rom_in_game(info, crc).map(|rom| RomMatch { game, rom }))
}

impl GameCatalog {
    /// Raccourci pour [`find_rom_by_crc`]
    pub fn find_rom_by_crc(&self, crc: u32, preferred: Option<usize>) -> Option<RomMatch> {
        find_rom_by_crc(self, preferred, crc)
    }
}
