//! Système de chargement des ROM sets SEGA Model 3
//!
//! Identifie le jeu contenu dans une archive uniquement à partir des CRC de
//! ses fichiers, vérifie que l'archive est complète puis place chaque fichier
//! dans les régions mémoire du système émulé.
//!
//! # Architecture
//!
//! - `database`: catalogue des jeux et descripteurs de ROMs
//! - `validation`: identification des ROMs par CRC32
//! - `decompression`: lecteurs d'archives (ZIP, répertoire, mémoire)
//! - `mapping`: table des régions et placement des octets (byte swap, entrelacement, miroirs)
//! - `loader`: chargement en deux passes d'un ROM set
//! - `error`: erreurs du chargement

pub mod database;
pub mod decompression;
pub mod error;
pub mod loader;
pub mod mapping;
pub mod validation;


use std::path::Path;

// Réexporter les types principaux pour faciliter l'utilisation
pub use database::{GameCatalog, GameInfo, RegionMirror, RomInfo};
pub use decompression::{
    open_archive, ArchiveEntry, ArchiveKind, DirectoryRomArchive, MemoryRomArchive, ReadStatus,
    RomArchive, ZipRomArchive,
};
pub use error::RomError;
pub use loader::{LoadOptions, LoadedGame, RomChecklist, RomSetLoader};
pub use mapping::{
    byte_swap, copy_region, mirror_region, place_rom, MappedRegion, Placement, RegionBuffers,
    RegionMap, RegionSummary,
};
pub use validation::{calculate_crc32, find_rom_by_crc, RomMatch};

/// Charge un ROM set complet depuis une archive et détecte le jeu.
///
/// Si l'archive contient plusieurs jeux, seul le premier identifié est chargé.
/// Avec `load_all`, toutes les ROMs du jeu doivent être placées dans une région
/// de `regions`; sinon les régions absentes sont ignorées.
///
/// Renvoie le jeu chargé, ou `None` en cas d'échec. Le détail des erreurs est
/// journalisé.
pub fn load_rom_set_from_archive<'c>(
    regions: &mut RegionMap<'_>,
    catalog: &'c GameCatalog,
    path: &Path,
    load_all: bool,
) -> Option<&'c GameInfo> {
    let options = LoadOptions {
        load_all,
        ..LoadOptions::default()
    };

    RomSetLoader::new(catalog)
        .with_options(options)
        .load_from_path(path, regions)
        .ok()
        .map(|loaded| loaded.game)
}
