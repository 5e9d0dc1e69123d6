use anyhow::{anyhow, Result};
use colored::*;
use reqwest::{Client, Method};
use serde_json::{json, Value};
use std::io::{self, Write};

struct Session {
    client: Client,
    base_url: String,
    token: String,
    username: String,
    role: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    println!("{}", "🛠️ EPJ Tracker Smoke Client".bright_blue().bold());
    println!("{}", "=====================================".bright_blue());
    println!();

    let base_url = std::env::args()
        .nth(1)
        .or_else(|| std::env::var("EPJ_URL").ok())
        .unwrap_or_else(|| "http://localhost:3000".to_string());
    let client = Client::new();

    check_health(&client, &base_url).await?;
    let session = login(client, base_url).await?;

    loop {
        println!();
        println!("{}", "📋 MAIN MENU".bright_green().bold());
        println!("{}", "==================".bright_green());
        println!("1. 🔍 Equipment statuses");
        println!("2. 📍 Equipment overview");
        println!("3. 🎯 My active trip");
        println!("4. ✅ Check out an EPJ");
        println!("5. 🔄 Check in");
        println!("6. 👥 Active drivers");
        println!("7. 📊 Dashboard (Admin)");
        println!("8. 🚪 Log out and quit");

        match prompt("Choose an option (1-8): ")?.as_str() {
            "1" => show(&session, Method::GET, "/api/equipment/statuses", None).await?,
            "2" => show(&session, Method::GET, "/api/equipment/overview", None).await?,
            "3" => show(&session, Method::GET, "/api/trips/mine", None).await?,
            "4" => {
                let equipment_id = prompt("EPJ id (blank for overspill): ")?;
                let driver_name = prompt("Driver name: ")?;
                let route = prompt("Route: ")?;
                let body = json!({
                    "equipment_id": if equipment_id.is_empty() { None } else { Some(equipment_id.clone()) },
                    "overspill": equipment_id.is_empty(),
                    "driver_name": driver_name,
                    "route": route,
                });
                show(&session, Method::POST, "/api/trips/checkout", Some(body)).await?;
            }
            "5" => {
                let zone = prompt("Check-in zone: ")?;
                let fault = prompt("Fault report (optional): ")?;
                let body = json!({ "check_in_zone": zone, "fault_report": fault });
                show(&session, Method::POST, "/api/trips/checkin", Some(body)).await?;
            }
            "6" => show(&session, Method::GET, "/api/auth/active-drivers", None).await?,
            "7" => show(&session, Method::GET, "/api/admin/dashboard", None).await?,
            "8" => {
                call(&session, Method::POST, "/api/auth/logout", None).await?;
                println!("{}", format!("👋 Goodbye, {}!", session.username).bright_green());
                break;
            }
            _ => println!("{}", "❌ Invalid option. Try again.".bright_red()),
        }
    }

    Ok(())
}

fn prompt(label: &str) -> Result<String> {
    print!("{}", label.bright_yellow());
    io::stdout().flush()?;
    let mut line = String::new();
    io::stdin().read_line(&mut line)?;
    Ok(line.trim().to_string())
}

async fn check_health(client: &Client, base_url: &str) -> Result<()> {
    let url = format!("{}/health", base_url);
    println!("{} {}", "📤 GET".bright_blue(), url);
    let body: Value = client.get(&url).send().await?.json().await?;
    println!("{}", serde_json::to_string_pretty(&body)?);
    if body["status"] != "ok" {
        return Err(anyhow!("service at {} is not healthy", base_url));
    }
    Ok(())
}

async fn login(client: Client, base_url: String) -> Result<Session> {
    println!();
    println!("{}", "🔐 LOGIN".bright_cyan().bold());
    println!("{}", "===============================".bright_cyan());
    let username = prompt("Username: ")?;
    let password = prompt("Password: ")?;

    let body: Value = client
        .post(format!("{}/api/auth/login", base_url))
        .json(&json!({ "username": username, "password": password }))
        .send()
        .await?
        .json()
        .await?;

    if body["success"] != true {
        println!("{}", "❌ LOGIN FAILED".bright_red().bold());
        println!("{}", serde_json::to_string_pretty(&body)?);
        return Err(anyhow!("login rejected"));
    }

    let data = &body["data"];
    let token = data["token"]
        .as_str()
        .ok_or_else(|| anyhow!("login response carried no token"))?
        .to_string();
    let session = Session {
        client,
        base_url,
        token,
        username: data["username"].as_str().unwrap_or_default().to_string(),
        role: data["role"].as_str().unwrap_or_default().to_string(),
    };
    println!(
        "{}",
        format!("✅ Logged in as {} ({})", session.username, session.role).bright_green()
    );
    Ok(session)
}

async fn call(session: &Session, method: Method, path: &str, body: Option<Value>) -> Result<(u16, Value)> {
    let mut request = session
        .client
        .request(method, format!("{}{}", session.base_url, path))
        .bearer_auth(&session.token);
    if let Some(body) = body {
        request = request.json(&body);
    }
    let response = request.send().await?;
    let status = response.status().as_u16();
    let text = response.text().await?;
    let value = serde_json::from_str(&text).unwrap_or(Value::String(text));
    Ok((status, value))
}

async fn show(session: &Session, method: Method, path: &str, body: Option<Value>) -> Result<()> {
    println!("{} {}", format!("📤 {}", method).bright_blue(), path);
    let (status, value) = call(session, method, path, body).await?;

    let header = format!("📥 HTTP {}", status);
    let ok = (200..300).contains(&status) && value["success"] != false;
    if ok {
        println!("{}", header.bright_green().bold());
    } else {
        println!("{}", header.bright_red().bold());
    }
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
