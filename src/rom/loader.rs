//! Chargement d'un ROM set complet depuis une archive
//!
//! Le chargement se fait en deux passes sur l'archive:
//!
//! 1. identification: le premier fichier reconnu désigne le jeu, puis on
//!    vérifie que toutes ses ROMs sont présentes, sans toucher à la mémoire;
//! 2. chargement: chaque fichier du jeu est extrait dans un buffer de travail
//!    unique puis placé dans sa région.
//!
//! Toutes les anomalies sont journalisées au moment où elles sont détectées;
//! l'appelant n'a qu'à tester le `Result`.

use log::{debug, error, info, warn};
use std::path::Path;

use super::database::{GameCatalog, GameInfo, RomInfo};
use super::decompression::{open_archive, ArchiveEntry, ReadStatus, RomArchive};
use super::error::RomError;
use super::mapping::{mirror_region, place_rom, Placement, RegionMap};

/// Options de chargement
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOptions {
    /// Toutes les ROMs doivent être placées dans une région mappée
    pub load_all: bool,

    /// Refuser les fichiers dont le CRC ne correspond pas à l'extraction
    pub reject_corrupt: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            load_all: true,
            reject_corrupt: false,
        }
    }
}

/// Jeu chargé avec succès
#[derive(Debug, Clone)]
pub struct LoadedGame<'c> {
    pub game: &'c GameInfo,

    /// Index du jeu dans le catalogue
    pub index: usize,

    /// Autres jeux reconnus dans l'archive (ignorés)
    pub other_games: Vec<&'c str>,

    pub files_written: usize,
    pub files_unmapped: usize,
    pub files_failed: usize,

    /// Fichiers chargés malgré une erreur CRC
    pub corrupt_files: Vec<String>,
}

/// Suivi des ROMs trouvées, par index stable dans `GameInfo::roms`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RomChecklist {
    found: Vec<bool>,
}

impl RomChecklist {
    pub fn new(count: usize) -> Self {
        Self {
            found: vec![false; count],
        }
    }

    pub fn mark(&mut self, rom: usize) {
        if let Some(flag) = self.found.get_mut(rom) {
            *flag = true;
        }
    }

    pub fn is_found(&self, rom: usize) -> bool {
        self.found.get(rom).copied().unwrap_or(false)
    }

    /// Index des ROMs non trouvées
    pub fn missing(&self) -> impl Iterator<Item = usize> + '_ {
        self.found
            .iter()
            .enumerate()
            .filter(|(_, &found)| !found)
            .map(|(rom, _)| rom)
    }

    pub fn is_complete(&self) -> bool {
        self.found.iter().all(|&found| found)
    }
}

/// Résultat de la passe d'identification
struct Discovery {
    game: usize,
    other_games: Vec<usize>,
}

/// Chargeur de ROM sets
pub struct RomSetLoader<'c> {
    catalog: &'c GameCatalog,
    options: LoadOptions,
}

impl<'c> RomSetLoader<'c> {
    pub fn new(catalog: &'c GameCatalog) -> Self {
        Self {
            catalog,
            options: LoadOptions::default(),
        }
    }

    pub fn with_options(mut self, options: LoadOptions) -> Self {
        self.options = options;
        self
    }

    pub fn options(&self) -> LoadOptions {
        self.options
    }

    /// Ouvre l'archive `path` (ZIP ou répertoire) et charge le jeu qu'elle contient
    pub fn load_from_path<P: AsRef<Path>>(
        &self,
        path: P,
        regions: &mut RegionMap<'_>,
    ) -> Result<LoadedGame<'c>, RomError> {
        let mut archive = open_archive(path.as_ref()).map_err(RomError::logged)?;
        self.load(archive.as_mut(), regions)
    }

    /// Identifie le jeu contenu dans `archive` et place ses ROMs dans `regions`
    pub fn load(
        &self,
        archive: &mut dyn RomArchive,
        regions: &mut RegionMap<'_>,
    ) -> Result<LoadedGame<'c>, RomError> {
        let discovery = self.discover(archive)?;
        self.load_pass(archive, regions, discovery)
    }

    fn discover(&self, archive: &mut dyn RomArchive) -> Result<Discovery, RomError> {
        let mut selected: Option<(usize, RomChecklist)> = None;
        let mut other_games: Vec<usize> = Vec::new();

        for index in 0..archive.len() {
            let entry = match archive.entry(index) {
                Ok(entry) => entry,
                Err(err) => {
                    debug!("{}", err);
                    continue;
                }
            };

            let preferred = selected.as_ref().map(|(game, _)| *game);
            let Some(hit) = self.catalog.find_rom_by_crc(entry.crc32, preferred) else {
                debug!("{}: {} (CRC={:08X}) non reconnu", archive.source(), entry.name, entry.crc32);
                continue;
            };

            let (game, checklist) = selected.get_or_insert_with(|| {
                let game = &self.catalog.games()[hit.game];
                info!("ROM set identifié: {} ({}), {}", game.id, game.title, archive.source());
                (hit.game, RomChecklist::new(game.roms.len()))
            });

            if hit.game == *game {
                checklist.mark(hit.rom);
                continue;
            }

            let other = &self.catalog.games()[hit.game];
            debug!("{} contient aussi: {} ({})", archive.source(), other.id, other.title);
            if other_games.is_empty() {
                warn!(
                    "Plusieurs jeux trouvés dans {}; chargement de \"{}\"",
                    archive.source(),
                    self.catalog.games()[*game].title
                );
            }
            if !other_games.contains(&hit.game) {
                other_games.push(hit.game);
            }
        }

        let Some((game, checklist)) = selected else {
            return Err(RomError::NoSupportedGame {
                path: archive.source().to_string(),
            }
            .logged());
        };

        let info = &self.catalog.games()[game];
        let mut missing = 0;
        for rom in checklist.missing() {
            let rom = &info.roms[rom];
            error!(
                "{}",
                RomError::MissingRom {
                    file: rom.file.clone(),
                    crc: rom.crc32,
                    path: archive.source().to_string(),
                }
            );
            missing += 1;
        }
        if missing > 0 {
            return Err(RomError::IncompleteSet {
                game: info.title.clone(),
                path: archive.source().to_string(),
                missing,
            }
            .logged());
        }

        Ok(Discovery { game, other_games })
    }

    fn load_pass(
        &self,
        archive: &mut dyn RomArchive,
        regions: &mut RegionMap<'_>,
        discovery: Discovery,
    ) -> Result<LoadedGame<'c>, RomError> {
        let game = &self.catalog.games()[discovery.game];

        // Buffer de travail unique, dimensionné pour la plus grande ROM du jeu
        let max_size = game.largest_rom_size();
        let mut scratch: Vec<u8> = Vec::new();
        scratch
            .try_reserve_exact(max_size)
            .map_err(|_| RomError::OutOfMemory { size: max_size }.logged())?;
        scratch.resize(max_size, 0);

        let mut loaded = LoadedGame {
            game,
            index: discovery.game,
            other_games: discovery
                .other_games
                .iter()
                .map(|&other| self.catalog.games()[other].id.as_str())
                .collect(),
            files_written: 0,
            files_unmapped: 0,
            files_failed: 0,
            corrupt_files: Vec::new(),
        };
        let mut checklist = RomChecklist::new(game.roms.len());

        for index in 0..archive.len() {
            let Ok(entry) = archive.entry(index) else {
                continue;
            };
            let Some(hit) = self.catalog.find_rom_by_crc(entry.crc32, Some(discovery.game)) else {
                continue;
            };
            if hit.game != discovery.game {
                continue;
            }

            let rom = &game.roms[hit.rom];
            match self.load_rom(archive, index, &entry, rom, &mut scratch, regions, &mut loaded) {
                Ok(placement) => {
                    match placement {
                        Placement::Written => loaded.files_written += 1,
                        Placement::Unmapped => loaded.files_unmapped += 1,
                    }
                    checklist.mark(hit.rom);
                }
                Err(err) if err.is_per_file() => {
                    error!("{}", err);
                    loaded.files_failed += 1;
                }
                Err(err) => return Err(err.logged()),
            }
        }

        if self.options.load_all {
            let mut failed = 0;
            for rom in checklist.missing() {
                let rom = &game.roms[rom];
                error!(
                    "{}",
                    RomError::NotLoaded {
                        file: rom.file.clone(),
                        crc: rom.crc32,
                        path: archive.source().to_string(),
                    }
                );
                failed += 1;
            }
            if failed > 0 {
                return Err(RomError::LoadIncomplete {
                    game: game.title.clone(),
                    path: archive.source().to_string(),
                    failed,
                }
                .logged());
            }
        }

        for mirror in &game.mirrors {
            if let Some(buf) = regions.get_mut(&mirror.region) {
                let written = mirror_region(buf, mirror.image_size);
                debug!("Miroir de \"{}\": {} octets", mirror.region, written);
            }
        }

        info!(
            "{} chargé depuis {}: {} fichier(s) placés, {} ignorés",
            game.title,
            archive.source(),
            loaded.files_written,
            loaded.files_unmapped
        );
        Ok(loaded)
    }

    /// Extrait une ROM dans le buffer de travail puis la place
    #[allow(clippy::too_many_arguments)]
    fn load_rom(
        &self,
        archive: &mut dyn RomArchive,
        index: usize,
        entry: &ArchiveEntry,
        rom: &RomInfo,
        scratch: &mut [u8],
        regions: &mut RegionMap<'_>,
        loaded: &mut LoadedGame<'c>,
    ) -> Result<Placement, RomError> {
        if entry.size != rom.size as u64 {
            return Err(RomError::SizeMismatch {
                file: entry.name.clone(),
                path: archive.source().to_string(),
                expected: rom.size,
                found: entry.size,
            });
        }

        let image = &mut scratch[..rom.size];
        match archive.read_entry(index, image)? {
            ReadStatus::Verified => {}
            ReadStatus::ChecksumMismatch { expected, found } => {
                let err = RomError::ChecksumMismatch {
                    file: entry.name.clone(),
                    path: archive.source().to_string(),
                    expected,
                    found,
                };
                if self.options.reject_corrupt {
                    return Err(err);
                }
                error!("{}", err);
                loaded.corrupt_files.push(entry.name.clone());
            }
        }

        place_rom(image, rom, regions, self.options.load_all)
    }
}
