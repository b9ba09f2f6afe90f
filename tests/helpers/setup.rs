use nudge_api::Application;
use nudge_infra::NudgeContext;

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.address, path)
    }
}

// Launch the application as a background task
pub async fn spawn_app() -> TestApp {
    let mut ctx = NudgeContext::create_inmemory();
    ctx.config.port = 0; // Random port

    let application = Application::new(ctx)
        .await
        .expect("Failed to build application.");

    let address = format!("http://localhost:{}", application.port());
    let _ = actix_web::rt::spawn(async move {
        application
            .start()
            .await
            .expect("Expected application to start");
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
    }
}
