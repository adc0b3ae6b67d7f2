//! Placement des ROMs dans les régions mémoire
//!
//! Une région est un buffer fourni par l'appelant. Les ROMs y sont copiées par
//! blocs de `group_size` octets espacés de `stride` octets: plusieurs puces
//! câblées en parallèle se partagent ainsi un bus plus large.

use std::collections::BTreeMap;

use super::database::{GameInfo, RomInfo};
use super::error::RomError;
use super::validation::calculate_crc32;

/// Région de destination empruntée à l'appelant
#[derive(Debug)]
pub struct MappedRegion<'a> {
    pub name: String,
    pub data: &'a mut [u8],
}

/// Table des régions mémoire du système émulé
#[derive(Debug, Default)]
pub struct RegionMap<'a> {
    regions: Vec<MappedRegion<'a>>,
}

impl<'a> RegionMap<'a> {
    pub fn new() -> Self {
        Self { regions: Vec::new() }
    }

    /// Déclare une région; les noms doivent être uniques
    pub fn insert(&mut self, name: &str, data: &'a mut [u8]) -> Result<(), RomError> {
        if self.contains(name) {
            return Err(RomError::DuplicateRegion(name.to_string()));
        }
        self.regions.push(MappedRegion {
            name: name.to_string(),
            data,
        });
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.regions.iter().any(|region| region.name == name)
    }

    /// Buffer de la région `name`
    pub fn get_mut(&mut self, name: &str) -> Option<&mut [u8]> {
        self.regions
            .iter_mut()
            .find(|region| region.name == name)
            .map(|region| &mut *region.data)
    }

    /// Capacité en octets de la région `name`
    pub fn capacity(&self, name: &str) -> Option<usize> {
        self.regions
            .iter()
            .find(|region| region.name == name)
            .map(|region| region.data.len())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.regions.iter().map(|region| region.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

/// Issue du placement d'une ROM
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Octets écrits dans la région
    Written,

    /// Région absente de la table, ROM ignorée
    Unmapped,
}

/// Inverse chaque paire d'octets adjacents.
///
/// Un octet final isolé est laissé en place.
pub fn byte_swap(buf: &mut [u8]) {
    for pair in buf.chunks_exact_mut(2) {
        pair.swap(0, 1);
    }
}

/// Répète `src` dans `dest` depuis `dest_offset` jusqu'à la fin du buffer.
///
/// La dernière copie est tronquée à la capacité de `dest`. Renvoie le nombre
/// d'octets écrits.
pub fn copy_region(dest: &mut [u8], dest_offset: usize, src: &[u8]) -> usize {
    if src.is_empty() || dest_offset >= dest.len() {
        return 0;
    }

    let mut written = 0;
    for chunk in dest[dest_offset..].chunks_mut(src.len()) {
        let len = chunk.len();
        chunk.copy_from_slice(&src[..len]);
        written += len;
    }
    written
}

/// Répète les `image_size` premiers octets de `buf` sur tout le buffer
pub fn mirror_region(buf: &mut [u8], image_size: usize) -> usize {
    if image_size == 0 || image_size >= buf.len() {
        return 0;
    }

    let mut offset = image_size;
    while offset < buf.len() {
        let len = image_size.min(buf.len() - offset);
        buf.copy_within(0..len, offset);
        offset += len;
    }
    buf.len() - image_size
}

/// Place l'image décompressée d'une ROM dans sa région.
///
/// `image` est modifiée sur place si la ROM doit être byte-swappée. Une région
/// absente est une erreur si `load_all` est vrai, sinon la ROM est ignorée.
pub fn place_rom(
    image: &mut [u8],
    rom: &RomInfo,
    regions: &mut RegionMap<'_>,
    load_all: bool,
) -> Result<Placement, RomError> {
    if image.len() != rom.size {
        return Err(RomError::ImageSizeMismatch {
            file: rom.file.clone(),
            region: rom.region.clone(),
            expected: rom.size,
            found: image.len(),
        });
    }

    if rom.byte_swap {
        byte_swap(image);
    }

    let dest = match regions.get_mut(&rom.region) {
        Some(dest) => dest,
        None if load_all => {
            return Err(RomError::UnmappedRegion {
                region: rom.region.clone(),
                file: rom.file.clone(),
            })
        }
        None => {
            log::debug!("{}: région \"{}\" non mappée, ignorée", rom.file, rom.region);
            return Ok(Placement::Unmapped);
        }
    };

    let end = rom.destination_end();
    if end > dest.len() || rom.group_size == 0 {
        return Err(RomError::RegionOverflow {
            region: rom.region.clone(),
            file: rom.file.clone(),
            end,
            capacity: dest.len(),
        });
    }

    for (step, group) in image.chunks_exact(rom.group_size).enumerate() {
        let start = rom.offset + step * rom.stride;
        dest[start..start + rom.group_size].copy_from_slice(group);
    }

    Ok(Placement::Written)
}

/// Buffers de régions possédés, pour les outils et les tests
#[derive(Debug, Clone, Default)]
pub struct RegionBuffers {
    buffers: BTreeMap<String, Vec<u8>>,
}

/// Résumé d'une région après chargement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionSummary {
    pub name: String,
    pub size: usize,
    pub crc32: u32,
}

impl RegionBuffers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Alloue chaque région du jeu à la taille requise par ses ROMs
    pub fn for_game(game: &GameInfo, fill: u8) -> Self {
        let mut buffers = Self::new();
        for (name, size) in game.region_sizes() {
            buffers.add(&name, size, fill);
        }
        buffers
    }

    /// Ajoute (ou agrandit) une région
    pub fn add(&mut self, name: &str, size: usize, fill: u8) {
        let buffer = self.buffers.entry(name.to_string()).or_default();
        if buffer.len() < size {
            buffer.resize(size, fill);
        }
    }

    pub fn get(&self, name: &str) -> Option<&[u8]> {
        self.buffers.get(name).map(Vec::as_slice)
    }

    /// Table de régions empruntant ces buffers
    pub fn region_map(&mut self) -> RegionMap<'_> {
        RegionMap {
            regions: self
                .buffers
                .iter_mut()
                .map(|(name, data)| MappedRegion {
                    name: name.clone(),
                    data: data.as_mut_slice(),
                })
                .collect(),
        }
    }

    pub fn summary(&self) -> Vec<RegionSummary> {
        self.buffers
            .iter()
            .map(|(name, data)| RegionSummary {
                name: name.clone(),
                size: data.len(),
                crc32: calculate_crc32(data),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SENTINEL: u8 = 0xEE;

    #[test]
    fn test_byte_swap_involution() {
        let original: Vec<u8> = (0..=255).collect();
        let mut data = original.clone();
        byte_swap(&mut data);
        assert_eq!(&data[..4], &[1, 0, 3, 2]);
        byte_swap(&mut data);
        assert_eq!(data, original);

        let mut odd = vec![1, 2, 3];
        byte_swap(&mut odd);
        assert_eq!(odd, vec![2, 1, 3]);
    }

    #[test]
    fn test_copy_region_fills_exactly() {
        for dest_size in 0..40 {
            for src_size in 1..=dest_size.max(1) {
                let src: Vec<u8> = (1..=src_size as u8).collect();
                let mut dest = vec![0u8; dest_size];
                let written = copy_region(&mut dest, 0, &src);
                assert_eq!(written, dest_size);
                for (i, &byte) in dest.iter().enumerate() {
                    assert_eq!(byte, src[i % src_size]);
                }
            }
        }
    }

    #[test]
    fn test_copy_region_with_offset() {
        let mut dest = vec![0u8; 10];
        assert_eq!(copy_region(&mut dest, 3, &[7, 8, 9]), 7);
        assert_eq!(dest, vec![0, 0, 0, 7, 8, 9, 7, 8, 9, 7]);
        assert_eq!(copy_region(&mut dest, 10, &[1]), 0);
        assert_eq!(copy_region(&mut dest, 0, &[]), 0);
    }

    #[test]
    fn test_mirror_region() {
        let mut buf = vec![1, 2, 3, 0, 0, 0, 0, 0];
        assert_eq!(mirror_region(&mut buf, 3), 5);
        assert_eq!(buf, vec![1, 2, 3, 1, 2, 3, 1, 2]);
        assert_eq!(mirror_region(&mut buf, 8), 0);
    }

    #[test]
    fn test_deinterleave_leaves_gaps() {
        let mut region = vec![SENTINEL; 16];
        let mut regions = RegionMap::new();
        regions.insert("crom", &mut region).unwrap();

        let rom = RomInfo::new("crom", "even.bin", 0, 8).interleaved(1, 2);
        let mut image: Vec<u8> = (0..8).collect();
        assert_eq!(place_rom(&mut image, &rom, &mut regions, true).unwrap(), Placement::Written);
        drop(regions);

        for i in 0..8 {
            assert_eq!(region[i * 2], i as u8);
            assert_eq!(region[i * 2 + 1], SENTINEL);
        }
    }

    #[test]
    fn test_interleaved_siblings_with_byte_swap() {
        let mut region = vec![0u8; 8];
        let mut regions = RegionMap::new();
        regions.insert("crom", &mut region).unwrap();

        let low = RomInfo::new("crom", "low.bin", 0, 4).interleaved(2, 4).byte_swapped();
        let high = RomInfo::new("crom", "high.bin", 0, 4).interleaved(2, 4).at_offset(2);

        place_rom(&mut [0xA1, 0xA0, 0xA3, 0xA2], &low, &mut regions, true).unwrap();
        place_rom(&mut [0xB0, 0xB1, 0xB2, 0xB3], &high, &mut regions, true).unwrap();
        drop(regions);

        assert_eq!(region, vec![0xA0, 0xA1, 0xB0, 0xB1, 0xA2, 0xA3, 0xB2, 0xB3]);
    }

    #[test]
    fn test_unmapped_region_policy() {
        let mut regions = RegionMap::new();
        let rom = RomInfo::new("vrom", "v.bin", 0, 2);

        assert_eq!(place_rom(&mut [1, 2], &rom, &mut regions, false).unwrap(), Placement::Unmapped);
        assert!(matches!(
            place_rom(&mut [1, 2], &rom, &mut regions, true),
            Err(RomError::UnmappedRegion { .. })
        ));
    }

    #[test]
    fn test_overflow_rejected_without_writing() {
        let mut region = vec![SENTINEL; 6];
        let mut regions = RegionMap::new();
        regions.insert("crom", &mut region).unwrap();

        let rom = RomInfo::new("crom", "big.bin", 0, 4).interleaved(1, 2);
        assert!(matches!(
            place_rom(&mut [1, 2, 3, 4], &rom, &mut regions, true),
            Err(RomError::RegionOverflow { end: 7, capacity: 6, .. })
        ));
        drop(regions);
        assert!(region.iter().all(|&b| b == SENTINEL));
    }

    #[test]
    fn test_overflowing_descriptor_rejected_without_panic() {
        let mut region = vec![SENTINEL; 8];
        let mut regions = RegionMap::new();
        regions.insert("crom", &mut region).unwrap();

        let rom = RomInfo::new("crom", "far.bin", 0, 4)
            .interleaved(2, 2)
            .at_offset(usize::MAX - 1);
        assert!(matches!(
            place_rom(&mut [1, 2, 3, 4], &rom, &mut regions, true),
            Err(RomError::RegionOverflow { end: usize::MAX, capacity: 8, .. })
        ));
        drop(regions);
        assert!(region.iter().all(|&b| b == SENTINEL));
    }

    #[test]
    fn test_size_mismatch_rejected() {
        let mut regions = RegionMap::new();
        let rom = RomInfo::new("crom", "a.bin", 0, 4);
        assert!(matches!(
            place_rom(&mut [1, 2], &rom, &mut regions, true),
            Err(RomError::ImageSizeMismatch { expected: 4, found: 2, region, .. }) if region == "crom"
        ));
    }

    #[test]
    fn test_duplicate_region_rejected() {
        let mut a = [0u8; 4];
        let mut b = [0u8; 4];
        let mut regions = RegionMap::new();
        regions.insert("crom", &mut a).unwrap();
        assert!(matches!(regions.insert("crom", &mut b), Err(RomError::DuplicateRegion(_))));
        assert_eq!(regions.len(), 1);
        assert_eq!(regions.capacity("crom"), Some(4));
    }

    #[test]
    fn test_region_buffers() {
        let game = GameInfo {
            id: "test".to_string(),
            title: "Test".to_string(),
            manufacturer: String::new(),
            year: 0,
            roms: vec![
                RomInfo::new("crom", "a.bin", 0, 4).interleaved(2, 4),
                RomInfo::new("crom", "b.bin", 0, 4).interleaved(2, 4).at_offset(2),
                RomInfo::new("sndprog", "s.bin", 0, 3),
            ],
            mirrors: vec![],
        };

        let mut buffers = RegionBuffers::for_game(&game, 0xFF);
        {
            let mut regions = buffers.region_map();
            assert_eq!(regions.capacity("crom"), Some(8));
            assert_eq!(regions.capacity("sndprog"), Some(3));
            place_rom(&mut [1, 2, 3], &game.roms[2], &mut regions, true).unwrap();
        }

        assert_eq!(buffers.get("sndprog"), Some(&[1u8, 2, 3][..]));
        let summary = buffers.summary();
        assert_eq!(summary.len(), 2);
        assert_eq!(summary[1].crc32, calculate_crc32(&[1, 2, 3]));
    }
}
