/// Example clustering a few small crystals by local environment
///
/// Run with `RUST_LOG=debug` to follow the phases of each run.
use envmatch::{MatchEnv, PairStrategy, SimBox};
use nalgebra::Vector3;

fn honeycomb(
    nx: usize,
    ny: usize,
) -> Result<(SimBox, Vec<Vector3<f64>>), Box<dyn std::error::Error>> {
    let a = 3f64.sqrt();
    let basis = [(0.0, 0.0), (a / 2.0, 0.5), (a / 2.0, 1.5), (0.0, 2.0)];
    let mut points = Vec::new();
    for cx in 0..nx {
        for cy in 0..ny {
            for &(x, y) in &basis {
                points.push(Vector3::new(x + cx as f64 * a, y + cy as f64 * 3.0, 0.0));
            }
        }
    }
    let sim_box = SimBox::square(nx as f64 * a, ny as f64 * 3.0)?;
    Ok((sim_box, points))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    println!("=== Clustering particles by local environment ===\n");

    // Example 1: square lattice, every site alike
    println!("1. Periodic square lattice:");
    let mut square = Vec::new();
    for x in 0..6 {
        for y in 0..6 {
            square.push(Vector3::new(x as f64, y as f64, 0.0));
        }
    }
    let mut matcher = MatchEnv::new(SimBox::square(6.0, 6.0)?, 1.5, 4)?;
    matcher.cluster(&square, 0.1, false)?;
    println!("   Particles: {}", matcher.num_particles()?);
    println!("   Clusters: {}\n", matcher.num_clusters()?);

    // Example 2: honeycomb, two sublattices with inverted environments
    println!("2. Honeycomb lattice:");
    let (sim_box, points) = honeycomb(4, 3)?;
    let mut matcher = MatchEnv::builder()
        .with_box(sim_box)
        .with_rmax(1.2)
        .with_num_neighbors(3)
        .with_pair_strategy(PairStrategy::AllPairs)
        .build()?;
    matcher.cluster(&points, 0.1, false)?;
    let results = matcher.results()?;
    println!("   Clusters: {}", results.num_clusters);
    for (label, size) in results.cluster_sizes() {
        println!("   Cluster {}: {} particles", label, size);
        for v in results.environment(label)? {
            println!("      ({:+.3}, {:+.3}, {:+.3})", v.x, v.y, v.z);
        }
    }
    println!();

    // Example 3: which honeycomb sites look like site 0?
    println!("3. Motif matching against site 0:");
    let motif = matcher.build_env(&points, 0, 0, false)?.vectors().to_vec();
    matcher.match_motif(&points, &motif, 0.1, false)?;
    let matches = matcher.results()?.motif_matches().unwrap_or_default();
    let hits = matches.iter().filter(|&&m| m).count();
    println!("   {} of {} sites match", hits, matches.len());

    Ok(())
}
