use std::sync::Arc;

use tracing::{error, info, warn};

use outlook_core::{
    logging,
    mcp_server::{JsonRpcHandler, McpServer},
    oauth::DeviceAuthStart,
    transport::StdioTransport,
    GraphClient, Settings,
};

fn show_device_prompt(start: &DeviceAuthStart) {
    // stdout is the protocol channel; the prompt has to go to stderr.
    match &start.message {
        Some(message) => eprintln!("{}", message),
        None => eprintln!(
            "To sign in, open {} and enter the code {}",
            start.verification_uri, start.user_code
        ),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_tracing(logging::DEFAULT_FILTER);

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("configuration error: {}", e);
            return Err(e.into());
        }
    };
    info!(name = %settings.identifier, "starting Outlook MCP server");

    // Constructed once here and shared by every registered tool.
    let client = Arc::new(GraphClient::from_settings(&settings));

    if client.tokens().load_cached().await {
        info!("using cached credential");
    } else if settings.interactive_auth {
        // Serve immediately; tools report unauthenticated until the user finishes.
        info!("no cached credential, starting device sign-in in the background");
        let sign_in = client.tokens().spawn_authenticate(show_device_prompt);
        tokio::spawn(async move {
            match sign_in.await {
                Ok(Ok(_)) => info!("device sign-in complete"),
                Ok(Err(e)) => {
                    warn!("device sign-in failed, tools will report unauthenticated: {}", e)
                }
                Err(e) => warn!("device sign-in task ended abnormally: {}", e),
            }
        });
    } else {
        warn!("not signed in; use the auth_start tool or `outlook login`");
    }

    let server = McpServer::from_settings(&settings, client);
    info!(tools = server.registry().len(), "MCP server ready, listening on stdio");
    let transport = StdioTransport::new(JsonRpcHandler::new(server));

    if let Err(e) = transport.run().await {
        error!("transport error: {}", e);
        return Err(e.into());
    }

    Ok(())
}
