use anyhow::Context;
use clap::Parser;
use model3_romset::*;
use std::path::PathBuf;

/// Vérifie et charge un ROM set SEGA Model 3
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Archive ZIP ou répertoire du ROM set
    #[arg(value_name = "ARCHIVE")]
    archive: PathBuf,

    /// Catalogue JSON des jeux (remplace celui de la configuration)
    #[arg(long, value_name = "FICHIER")]
    catalog: Option<String>,

    /// Fichier de configuration TOML
    #[arg(long, value_name = "FICHIER", default_value = "romloader.toml")]
    config: String,

    /// Ignorer les ROMs dont la région n'est pas mappée
    #[arg(long)]
    partial: bool,

    /// Refuser les fichiers dont le CRC est incorrect
    #[arg(long)]
    strict_crc: bool,
}

impl Args {
    /// Applique les options de la ligne de commande sur la configuration
    fn apply(&self, config: &mut RomLoaderConfig) {
        if let Some(catalog) = &self.catalog {
            config.catalog.path = catalog.clone();
        }
        if self.partial {
            config.loading.load_all = false;
        }
        if self.strict_crc {
            config.loading.reject_corrupt_files = true;
        }
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = RomLoaderConfig::load_or_default(&args.config);
    args.apply(&mut config);

    let env = env_logger::Env::default().default_filter_or(config.logging.level.as_str());
    env_logger::Builder::from_env(env).init();

    println!("🎮 Model 3 ROM set loader v{}", VERSION);
    println!("================================");

    let catalog = GameCatalog::load_from_file(&config.catalog.path)
        .with_context(|| format!("Impossible de lire le catalogue {}", config.catalog.path))?;
    println!("Catalogue: {} jeu(x) depuis {}", catalog.len(), config.catalog.path);

    // Chaque région est dimensionnée pour le plus exigeant des jeux connus
    let mut buffers = RegionBuffers::new();
    for game in catalog.games() {
        for (name, size) in game.region_sizes() {
            buffers.add(&name, size, 0);
        }
    }

    let result = RomSetLoader::new(&catalog)
        .with_options(config.load_options())
        .load_from_path(&args.archive, &mut buffers.region_map());

    match result {
        Ok(loaded) => {
            println!(
                "✅ {} ({}, {}) chargé depuis {}",
                loaded.game.title,
                loaded.game.manufacturer,
                loaded.game.year,
                args.archive.display()
            );
            println!("  Fichiers placés: {}", loaded.files_written);
            if loaded.files_unmapped > 0 {
                println!("  Fichiers ignorés: {}", loaded.files_unmapped);
            }
            if !loaded.corrupt_files.is_empty() {
                println!("  ⚠️  CRC incorrect: {}", loaded.corrupt_files.join(", "));
            }
            if !loaded.other_games.is_empty() {
                println!("  Autres jeux présents: {}", loaded.other_games.join(", "));
            }

            let used = loaded.game.region_sizes();
            for region in buffers.summary() {
                if used.contains_key(&region.name) {
                    println!(
                        "    {}: {} octets, CRC32 {:08X}",
                        region.name, region.size, region.crc32
                    );
                }
            }
            Ok(())
        }
        Err(e) => {
            println!("❌ Échec du chargement de {}: {}", args.archive.display(), e);
            Err(e.into())
        }
    }
}
