mod error;
mod handlers;
mod models;
mod routes;

#[cfg(test)]
mod tests;

use axum::{body::Body, extract::Request, response::Response};
use lambda_http::{
    run, service_fn, Body as LambdaBody, Error, Request as LambdaRequest,
    Response as LambdaResponse,
};
use tower::ServiceExt;

// The Lambda handler function
async fn function_handler(event: LambdaRequest) -> Result<LambdaResponse<LambdaBody>, Error> {
    tracing::info!(
        "Received Lambda request: method={:?}, path={:?}, query_params={:?}",
        event.method(),
        event.uri().path(),
        event.uri().query()
    );

    let app = routes::create_router().await;

    // Convert the Lambda event to an HTTP request for Axum
    let (parts, body) = event.into_parts();
    let body = match body {
        LambdaBody::Empty => Body::empty(),
        LambdaBody::Text(text) => Body::from(text),
        LambdaBody::Binary(data) => Body::from(data),
    };
    let http_request = Request::from_parts(parts, body);

    let response = app.oneshot(http_request).await.map_err(|err| {
        tracing::error!("Error from Axum router: {:?}", err);
        err
    })?;

    response_to_lambda(response).await
}

// Convert the Axum response to a format suitable for Lambda
async fn response_to_lambda(response: Response) -> Result<LambdaResponse<LambdaBody>, Error> {
    let (parts, body) = response.into_parts();

    let bytes = axum::body::to_bytes(body, usize::MAX).await.map_err(|err| {
        tracing::error!("Failed to read response body: {:?}", err);
        err
    })?;

    let builder = LambdaResponse::builder().status(parts.status);
    let builder_with_headers = parts
        .headers
        .iter()
        .fold(builder, |builder, (name, value)| {
            builder.header(name.as_str(), value.as_bytes())
        });

    let lambda_response = if bytes.is_empty() {
        builder_with_headers.body(LambdaBody::Empty)?
    } else {
        builder_with_headers.body(LambdaBody::Binary(bytes.to_vec()))?
    };

    Ok(lambda_response)
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    let log_level =
        std::env::var("RUST_LOG").unwrap_or_else(|_| "info,adflow_campaign_service=debug".into());

    tracing_subscriber::fmt()
        .with_env_filter(log_level)
        .with_ansi(false) // Disable ANSI colors in Lambda environment
        .with_target(true)
        .init();

    if let Ok(function_name) = std::env::var("AWS_LAMBDA_FUNCTION_NAME") {
        tracing::info!(
            "Starting AWS Lambda function: {} (version: {})",
            function_name,
            std::env::var("AWS_LAMBDA_FUNCTION_VERSION").unwrap_or_else(|_| "unknown".into())
        );
    } else {
        tracing::info!("Starting service in non-Lambda environment");
    }

    run(service_fn(function_handler)).await?;

    Ok(())
}
