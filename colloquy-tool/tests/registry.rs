use colloquy_tool::*;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

fn forecast_tool() -> Arc<dyn ToolDyn> {
    Arc::new(tool_fn(
        "get_weather_forecast",
        "Weather forecast for a city",
        json!({
            "type": "object",
            "properties": {"city": {"type": "string"}},
            "required": ["city"]
        }),
        |input, _ctx| async move {
            let city = input["city"]
                .as_str()
                .ok_or_else(|| ToolError::InvalidInput("city is required".into()))?;
            Ok(format!("{{\"city\":\"{city}\",\"forecast\":\"sunny\"}}"))
        },
    ))
}

fn solar_tool() -> Arc<dyn ToolDyn> {
    Arc::new(tool_fn(
        "get_solar_activity",
        "Current solar activity",
        json!({"type": "object"}),
        |_input, _ctx| async move { Ok("kp=3".to_string()) },
    ))
}

fn slow_tool() -> Arc<dyn ToolDyn> {
    Arc::new(tool_fn(
        "slow",
        "Never finishes in time",
        json!({"type": "object"}),
        |_input, _ctx| async move {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        },
    ))
}

#[test]
fn schemas_are_sorted_by_name() {
    let mut registry = ToolRegistry::new();
    registry.register(forecast_tool());
    registry.register(solar_tool());

    let names: Vec<String> = registry.schemas(None).into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["get_solar_activity", "get_weather_forecast"]);
}

#[test]
fn schemas_respect_enabled_list() {
    let mut registry = ToolRegistry::new();
    registry.register(forecast_tool());
    registry.register(solar_tool());

    let enabled = vec!["get_weather_forecast".to_string(), "not_registered".to_string()];
    let schemas = registry.schemas(Some(&enabled));
    assert_eq!(schemas.len(), 1);
    assert_eq!(schemas[0].name, "get_weather_forecast");
    assert_eq!(schemas[0].input_schema["required"][0], "city");

    assert!(registry.schemas(Some(&[])).is_empty());
}

#[tokio::test]
async fn invalid_input_surfaces_tool_error() {
    let mut registry = ToolRegistry::new();
    registry.register(forecast_tool());

    let err = registry
        .invoke("get_weather_forecast", json!({}), &ToolContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::InvalidInput(_)));
    assert_eq!(err.to_string(), "invalid input: city is required");
}

#[tokio::test]
async fn slow_tool_times_out() {
    let mut registry = ToolRegistry::new().with_timeout(Duration::from_millis(20));
    registry.register(slow_tool());

    let err = registry
        .invoke("slow", json!({}), &ToolContext::default())
        .await
        .unwrap_err();
    assert!(matches!(err, ToolError::Timeout(d) if d == Duration::from_millis(20)));
}

#[tokio::test]
async fn tools_see_prior_results_and_session() {
    let summary = tool_fn(
        "summarize_results",
        "Summarizes earlier tool output",
        json!({"type": "object"}),
        |_input, ctx: ToolContext| async move {
            let weather = ctx.prior_result("get_weather_forecast").unwrap_or("none");
            let session = ctx.session_id.clone().unwrap_or_default();
            Ok(format!("{session}: {weather}"))
        },
    );
    let mut registry = ToolRegistry::new();
    registry.register(Arc::new(summary));

    let mut ctx = ToolContext::for_session("s-1");
    ctx.prior_results
        .insert("get_weather_forecast".into(), "sunny".into());

    let out = registry
        .invoke("summarize_results", json!({}), &ctx)
        .await
        .unwrap();
    assert_eq!(out, "s-1: sunny");
}

#[test]
fn default_timeout_is_ten_seconds() {
    assert_eq!(ToolRegistry::default().timeout(), DEFAULT_TOOL_TIMEOUT);
    assert_eq!(DEFAULT_TOOL_TIMEOUT, Duration::from_secs(10));
}
