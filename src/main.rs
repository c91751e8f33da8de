use log::{error, info};

use appcore::application::{Application, RequestHandler};
use appcore::config::AppConfig;
use appcore::core::error::AppResult;
use appcore::logging::init_logging;

/// Demo handler: reports the request id and stamps the response.
struct DemoHandler;

impl RequestHandler for DemoHandler {
    fn process_request(&mut self, app: &Application) -> AppResult<()> {
        let request = app.request()?;
        info!("Processing request {}", request.id());

        let response = app.response()?;
        response.set_header("x-request-id", request.id());
        response.set_status(200);
        Ok(())
    }
}

fn main() {
    // Read the config path from the command line, with a conventional default
    let conf_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.yaml".to_string());

    let config = AppConfig::load_from_yaml(&conf_path).expect("Failed to load configuration");
    init_logging(&config.log);

    info!("Constructing application...");
    let app = Application::new(config).expect("Failed to construct application");

    info!("Initializing application {}...", app.id());
    app.initialize().expect("Failed to initialize application");

    app.on_before_request(|app| info!("Request starting on {}", app.name()));
    app.on_after_request(|_| info!("Request finished"));

    let mut handler = DemoHandler;
    if let Err(e) = app.run(&mut handler) {
        if let Ok(error_handler) = app.error_handler() {
            error_handler.handle(&e);
        } else {
            error!("Request failed: {e}");
        }
        app.end(1, true);
    }

    app.end(0, true);
}
