//! Calcul des modes AMS3D à partir d'un nuage de points LiDAR (CSV x,y,z).
//!
//! Usage :
//!   cargo run --release -- points.csv
//!   cargo run --release -- points.csv --ground MNT.tif --min-height 5 --centroids
//!
//! Produit :
//!   modes.csv — point, x, y, z (NaN = point rejeté)
//!   centroides.csv (avec --centroids) — point, step, x, y, z

use crownshift::{
    calculate_mode, calculate_mode_with_centroids, mean_shift::MODES_PER_PROGRESS_TICK,
    ModeSearchParams, Point3D, PointCloudIndex, Raster, ScalarField,
};

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::sync::atomic::{AtomicUsize, Ordering};

use clap::Parser;
use csv::{ReaderBuilder, Writer};
use rayon::prelude::*;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;

// ==========================================================================
// Lecture du nuage de points (CSV x,y,z)
// ==========================================================================

/// Lit un CSV de colonnes x,y,z (avec ou sans en-tête). Les valeurs non
/// numériques deviennent NaN et seront rejetées point par point par le cœur.
fn load_points_csv(path: &str) -> Vec<Point3D> {
    let file = File::open(path).unwrap_or_else(|e| {
        eprintln!("Impossible d'ouvrir '{}' : {}", path, e);
        std::process::exit(1);
    });

    let mut reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(BufReader::new(file));

    let mut points: Vec<Point3D> = Vec::new();
    for record in reader.records() {
        let record = record.unwrap_or_else(|e| {
            eprintln!("Erreur lecture CSV : {}", e);
            std::process::exit(1);
        });
        if record.len() < 3 {
            continue;
        }
        let parse = |i: usize| record.get(i).and_then(|s| s.trim().parse::<f64>().ok());
        match (parse(0), parse(1), parse(2)) {
            (Some(x), Some(y), Some(z)) => points.push([x, y, z]),
            // Ligne d'en-tête (x,y,z) ou ligne invalide : ignorée.
            _ => continue,
        }
    }
    points
}

// ==========================================================================
// Lecture des grilles GeoTIFF (MNT, grilles de ratios)
// ==========================================================================

/// Lit la résolution et l'origine géographique depuis les tags GeoTIFF
/// ModelPixelScaleTag (33550) et ModelTiepointTag (33922).
///
/// Retourne (res_x, res_y, origin_x, origin_y).
fn geotiff_extent_from_decoder<R: std::io::Read + std::io::Seek>(
    decoder: &mut Decoder<R>,
) -> (f64, f64, f64, f64) {
    let mut res_x = 1.0_f64;
    let mut res_y = 1.0_f64;
    let mut origin_x = 0.0_f64;
    let mut origin_y = 0.0_f64;

    if let Ok(Some(scale_val)) = decoder.find_tag(Tag::ModelPixelScaleTag) {
        if let Ok(scale) = scale_val.into_f64_vec() {
            if scale.len() >= 2 {
                res_x = scale[0];
                res_y = scale[1];
            }
        }
    } else {
        eprintln!("⚠ Tag ModelPixelScale (33550) absent — résolution par défaut 1.0m");
    }
    if let Ok(Some(tie_val)) = decoder.find_tag(Tag::ModelTiepointTag) {
        if let Ok(tie) = tie_val.into_f64_vec() {
            if tie.len() >= 6 {
                origin_x = tie[3];
                origin_y = tie[4];
            }
        }
    } else {
        eprintln!("⚠ Tag ModelTiepoint (33922) absent — origine par défaut (0, 0)");
    }

    (res_x, res_y, origin_x, origin_y)
}

/// Charge un GeoTIFF mono-bande en grille de valeurs.
fn load_geotiff(path: &str) -> Raster {
    let file = File::open(path).unwrap_or_else(|e| {
        eprintln!("Impossible d'ouvrir '{}' : {}", path, e);
        std::process::exit(1);
    });
    let mut decoder = Decoder::new(BufReader::new(file)).unwrap_or_else(|e| {
        eprintln!("Erreur décodage TIFF : {}", e);
        std::process::exit(1);
    });

    let (width, height) = decoder.dimensions().unwrap();
    let num_cols = width as usize;
    let num_rows = height as usize;

    let (res_x, res_y, origin_x, origin_y) = geotiff_extent_from_decoder(&mut decoder);

    let x_min = origin_x;
    let y_max = origin_y;
    let x_max = x_min + num_cols as f64 * res_x;
    let y_min = y_max - num_rows as f64 * res_y;

    let result = decoder.read_image().unwrap_or_else(|e| {
        eprintln!("Erreur lecture image : {}", e);
        std::process::exit(1);
    });

    let raw: Vec<f64> = match result {
        DecodingResult::F64(v) => v,
        DecodingResult::F32(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::U16(v) => v.iter().map(|x| *x as f64).collect(),
        DecodingResult::U8(v) => v.iter().map(|x| *x as f64).collect(),
        _ => {
            eprintln!("Format pixel non supporté");
            std::process::exit(1);
        }
    };

    // Multi-bande : seule la première bande est utilisée.
    let total_pixels = num_rows * num_cols;
    let n_bands = raw.len() / total_pixels;
    let band_data: Vec<f64> = if n_bands > 1 {
        eprintln!("⚠ {} bandes détectées — bande 0 utilisée", n_bands);
        (0..total_pixels).map(|px| raw[px * n_bands]).collect()
    } else {
        raw
    };

    Raster::new(band_data, num_rows, num_cols, x_min, x_max, y_min, y_max)
}

/// Champ scalaire : grille GeoTIFF si un chemin est donné, constante sinon.
fn field_from(grid_path: Option<&String>, constant: f64) -> ScalarField {
    match grid_path {
        Some(path) => {
            println!("   Chargement de '{}'...", path);
            ScalarField::Grid(load_geotiff(path))
        }
        None => ScalarField::Constant(constant),
    }
}

// ==========================================================================
// Export CSV
// ==========================================================================

fn export_modes_csv(modes: &[Point3D], path: &str) {
    let file = File::create(path).unwrap_or_else(|e| {
        eprintln!("Impossible de créer '{}' : {}", path, e);
        std::process::exit(1);
    });
    let mut wtr = Writer::from_writer(BufWriter::new(file));
    wtr.write_record(["point", "x", "y", "z"]).unwrap();
    for (i, m) in modes.iter().enumerate() {
        wtr.write_record([
            i.to_string(),
            m[0].to_string(),
            m[1].to_string(),
            m[2].to_string(),
        ])
        .unwrap();
    }
    wtr.flush().unwrap_or_else(|e| {
        eprintln!("Erreur flush CSV : {}", e);
        std::process::exit(1);
    });
}

fn export_centroids_csv(trails: &[Vec<Point3D>], path: &str) {
    let file = File::create(path).unwrap_or_else(|e| {
        eprintln!("Impossible de créer '{}' : {}", path, e);
        std::process::exit(1);
    });
    let mut wtr = Writer::from_writer(BufWriter::new(file));
    wtr.write_record(["point", "step", "x", "y", "z"]).unwrap();
    for (i, trail) in trails.iter().enumerate() {
        for (step, c) in trail.iter().enumerate() {
            wtr.write_record([
                i.to_string(),
                step.to_string(),
                c[0].to_string(),
                c[1].to_string(),
                c[2].to_string(),
            ])
            .unwrap();
        }
    }
    wtr.flush().unwrap_or_else(|e| {
        eprintln!("Erreur flush CSV : {}", e);
        std::process::exit(1);
    });
}

// ==========================================================================
// CLI (clap)
// ==========================================================================

#[derive(Parser, Debug)]
#[command(
    name = "crownshift",
    about = "Calcul des modes AMS3D sur un nuage de points LiDAR",
    after_help = "Produit : modes.csv — point, x, y, z (NaN = point rejeté)"
)]
struct Cli {
    /// Nuage de points en entrée, CSV de colonnes x,y,z
    #[arg(value_name = "points.csv")]
    points_path: String,

    /// MNT GeoTIFF optionnel : les z sont alors des altitudes absolues
    #[arg(long, value_name = "MNT.tif")]
    ground: Option<String>,

    /// Grille GeoTIFF optionnelle du ratio diamètre de houppier / hauteur
    #[arg(long, value_name = "ratio.tif")]
    diameter_ratio_grid: Option<String>,

    /// Grille GeoTIFF optionnelle du ratio hauteur de houppier / hauteur
    #[arg(long, value_name = "ratio.tif")]
    height_ratio_grid: Option<String>,

    /// Hauteur min au-dessus du sol (m)
    #[arg(long, default_value_t = 2.0)]
    min_height: f64,

    /// Ratio diamètre de houppier / hauteur d'arbre
    #[arg(long, default_value_t = 0.6)]
    diameter_ratio: f64,

    /// Ratio hauteur de houppier / hauteur d'arbre
    #[arg(long, default_value_t = 0.5)]
    height_ratio: f64,

    /// Distance de convergence entre centroïdes consécutifs (m)
    #[arg(long, default_value_t = 0.01)]
    convergence: f64,

    /// Nombre max de centroïdes par mode
    #[arg(long, default_value_t = 100)]
    max_centroids: usize,

    /// Exporter aussi les trajectoires de centroïdes
    #[arg(long)]
    centroids: bool,

    /// Fichier CSV de sortie des modes
    #[arg(long, short, default_value = "modes.csv")]
    output: String,

    /// Fichier CSV de sortie des centroïdes (avec --centroids)
    #[arg(long, default_value = "centroides.csv")]
    centroids_output: String,
}

// ==========================================================================
// Main
// ==========================================================================

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    println!("══════════════════════════════════════════════════════════");
    println!("  crownshift — Modes AMS3D sur nuage de points LiDAR");
    println!("══════════════════════════════════════════════════════════\n");

    println!("1. Chargement de '{}'...", cli.points_path);
    let points = load_points_csv(&cli.points_path);
    if points.is_empty() {
        eprintln!("Erreur : aucun point lu depuis '{}'.", cli.points_path);
        std::process::exit(1);
    }
    println!("   {} points lus", points.len());

    println!("2. Paramètres :");
    println!(
        "   min_height={:.1}m  d_ratio={:.2}  h_ratio={:.2}  convergence={:.3}m  max_centroids={}",
        cli.min_height, cli.diameter_ratio, cli.height_ratio, cli.convergence, cli.max_centroids
    );
    if cli.ground.is_some() {
        println!("   MNT : oui (altitudes absolues)");
    }

    let ground = field_from(cli.ground.as_ref(), 0.0);
    let diameter_ratio = field_from(cli.diameter_ratio_grid.as_ref(), cli.diameter_ratio);
    let height_ratio = field_from(cli.height_ratio_grid.as_ref(), cli.height_ratio);

    let params = ModeSearchParams::with_fields(
        cli.min_height,
        ground.clone(),
        diameter_ratio,
        height_ratio,
        cli.convergence,
        cli.max_centroids,
    );

    println!("3. Construction de l'index spatial...");
    let t0 = std::time::Instant::now();
    let index = PointCloudIndex::from_points_above_ground(&points, cli.min_height, &ground);
    println!(
        "   {} points indexés en {:.2}s",
        index.len(),
        t0.elapsed().as_secs_f64()
    );

    println!("4. Calcul des modes...");
    let t0 = std::time::Instant::now();
    let done = AtomicUsize::new(0);
    let tick = |n: usize| {
        if n % MODES_PER_PROGRESS_TICK == 0 {
            log::info!("{} / {} modes calculés", n, points.len());
        }
    };

    // Un point, un mode : l'index et les champs ne sont que lus, le calcul
    // se parallélise donc trivialement sur les points.
    let (modes, trails): (Vec<Point3D>, Option<Vec<Vec<Point3D>>>) = if cli.centroids {
        let per_point: Vec<(Point3D, Vec<Point3D>)> = points
            .par_iter()
            .map(|p| {
                let result = calculate_mode_with_centroids(p, &index, &params);
                tick(done.fetch_add(1, Ordering::Relaxed) + 1);
                result
            })
            .collect();
        let modes = per_point.iter().map(|(m, _)| *m).collect();
        let trails = per_point.into_iter().map(|(_, t)| t).collect();
        (modes, Some(trails))
    } else {
        let modes = points
            .par_iter()
            .map(|p| {
                let mode = calculate_mode(p, &index, &params);
                tick(done.fetch_add(1, Ordering::Relaxed) + 1);
                mode
            })
            .collect();
        (modes, None)
    };
    let dt = t0.elapsed();

    let num_rejected = modes.iter().filter(|m| m[0].is_nan()).count();
    println!(
        "   ✓ {} modes calculés en {:.2}s ({} points rejetés)\n",
        modes.len(),
        dt.as_secs_f64(),
        num_rejected
    );

    println!("5. Export → '{}'", cli.output);
    export_modes_csv(&modes, &cli.output);
    if let Some(trails) = &trails {
        println!("   Export des centroïdes → '{}'", cli.centroids_output);
        export_centroids_csv(trails, &cli.centroids_output);
    }

    println!("\n══════════════════════════════════════════════════════════");
    println!(
        "  ✓ Terminé — {} modes ({} rejetés) sur {} points",
        modes.len() - num_rejected,
        num_rejected,
        points.len()
    );
    println!("══════════════════════════════════════════════════════════");
}
