use std::sync::Arc;

use reach::FrontendRegistry;
use reach::run_main;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Create frontend registry and register supported source languages
    let mut registry = FrontendRegistry::new();
    registry.register(reach::frontends::simple::SimpleFrontend::new());

    // Run the shared main function
    run_main(Arc::new(registry))?;
    Ok(())
}
