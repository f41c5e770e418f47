// Terms of service page served at `/terms`.

pub const LAST_UPDATED: &str = "Feb 21, 2026";
pub const CONTACT_EMAIL: &str = "your-email@example.com";

/// Render the terms page with the configured per-request price.
pub fn render_terms(price_per_request: f64) -> String {
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
    <title>Terms of Service - Data Validator Agent</title>
    <style>
        body {{ font-family: Arial, sans-serif; max-width: 800px; margin: 50px auto; padding: 20px; }}
    </style>
</head>
<body>
    <h1>Terms of Service</h1>
    <p><strong>Last updated:</strong> {LAST_UPDATED}</p>

    <h2>1. Service Description</h2>
    <p>Data Validator Agent provides AI-powered data validation services. It checks facts, logical errors, and misinformation for other AI agents and applications.</p>

    <h2>2. Pricing</h2>
    <p>${price_per_request:.2} per successful request. Payments are processed through Skyfire protocol.</p>

    <h2>3. Usage</h2>
    <p>This service is intended for AI agents and developers. You agree not to misuse the API or attempt to reverse-engineer it.</p>

    <h2>4. Disclaimer</h2>
    <p>The service provides validation based on AI models. Accuracy is not guaranteed 100%. Use at your own discretion.</p>

    <h2>5. Contact</h2>
    <p>Email: {CONTACT_EMAIL}</p>
</body>
</html>
"#
    )
}
