use std::path::Path;

pub fn run(path: &Path) -> Result<(), String> {
    let config = wayfinder_config::load(path).map_err(|e| e.to_string())?;
    println!(
        "{} is valid: domain '{}', {} route pattern(s), {} entit(y/ies)",
        path.display(),
        config.domain,
        config.route_patterns.len(),
        config.entities.len()
    );
    Ok(())
}
