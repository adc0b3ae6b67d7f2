//! Model 3 ROM set - Chargement des ROM sets SEGA Model 3
//!
//! Cette bibliothèque identifie le jeu contenu dans une archive de ROMs,
//! vérifie qu'elle est complète et place chaque fichier dans les régions
//! mémoire du système émulé.

pub mod rom;
pub mod config;

pub use rom::*;
pub use config::*;

/// Version du chargeur
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
