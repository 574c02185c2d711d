use std::env;
use std::sync::OnceLock;
use std::time::Instant;

static START_TIME: OnceLock<Instant> = OnceLock::new();

fn use_color() -> bool {
    static USE_COLOR: OnceLock<bool> = OnceLock::new();
    *USE_COLOR.get_or_init(|| env::var_os("NO_COLOR").is_none())
}

fn paint(code: &str, text: &str) -> String {
    if use_color() {
        format!("\u{1b}[{}m{}\u{1b}[0m", code, text)
    } else {
        text.to_string()
    }
}

fn dim(text: &str) -> String {
    paint("2", text)
}

fn green(text: &str) -> String {
    paint("32", text)
}

fn cyan(text: &str) -> String {
    paint("36", text)
}

fn yellow(text: &str) -> String {
    paint("33", text)
}

fn red(text: &str) -> String {
    paint("31", text)
}

fn elapsed_secs() -> f64 {
    START_TIME
        .get()
        .map(|t| t.elapsed().as_secs_f64())
        .unwrap_or(0.0)
}

pub fn header(command: &str, version: &str) {
    START_TIME.get_or_init(Instant::now);
    eprintln!("{}", dim(&format!("depweight {} v{}", command, version)));
    eprintln!();
}

/// One row of the weight table: share as a percentage, then the name.
pub fn weight(name: &str, weight: f64) {
    println!("{} {}", cyan(&format!("{:>9.4}%", weight * 100.0)), name);
}

pub fn summary(count: usize, total: f64, discarded: f64) {
    println!();
    let seconds = elapsed_secs();
    let time_str = if seconds < 1.0 {
        format!("{:.0}ms", seconds * 1000.0)
    } else {
        format!("{:.2}s", seconds)
    };
    let noun = if count == 1 { "package" } else { "packages" };
    println!(
        "{} {} weighed {} {}",
        green(&count.to_string()),
        noun,
        dim(&format!("[{}]", time_str)),
        dim(&format!("(total {:.6}, discarded {:.6})", total, discarded))
    );
}

pub fn valid(name: &str) {
    println!("{} {}", green("ok"), name);
}

pub fn invalid(name: &str) {
    println!("{} {}", red("invalid"), name);
}

pub fn warn(message: &str) {
    let tag = yellow("warn");
    eprintln!("{} {}", tag, message);
}

pub fn info(message: &str) {
    println!("{}", message);
}
