//! Device command handlers.

use serde_json::Value;
use tabled::Tabled;

use atomfan_core::{ControlCommand, Device, FanMode, FanSpeed, MAX_SPEED, Session};

use crate::cli::{DevicesArgs, DevicesCommand, GlobalOpts, ModeArg, PowerState};
use crate::error::CliError;
use crate::output;

use super::util;

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Power")]
    power: String,
    #[tabled(rename = "Speed")]
    speed: String,
    #[tabled(rename = "Mode")]
    mode: String,
}

impl DeviceRow {
    fn new(d: &Device, color: bool) -> Self {
        Self {
            id: d.id.clone(),
            name: d.display_name(),
            power: output::power_label(d.is_on(), color),
            speed: speed_label(d),
            mode: d.status.mode.to_string(),
        }
    }
}

/// Speed only means something while the fan runs.
fn speed_label(d: &Device) -> String {
    if d.is_on() {
        d.status.speed.to_string()
    } else {
        "-".into()
    }
}

fn detail(d: &Device, color: bool) -> String {
    let mut lines = vec![
        format!("ID:     {}", d.id),
        format!("Name:   {}", d.display_name()),
    ];
    if let Some(ref kind) = d.device_type {
        lines.push(format!("Type:   {kind}"));
    }
    lines.push(format!("Power:  {}", output::power_label(d.is_on(), color)));
    lines.push(format!("Speed:  {} / {MAX_SPEED}", d.status.speed));
    lines.push(format!("Mode:   {}", d.status.mode));
    lines.join("\n")
}

/// `key: value` lines for an object body; pretty JSON for anything else.
fn status_detail(body: &Value) -> String {
    let Value::Object(map) = body else {
        return serde_json::to_string_pretty(body).unwrap_or_default();
    };
    let mut entries: Vec<_> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));
    let width = map.keys().map(String::len).max().unwrap_or(0) + 1;
    let mut out = String::new();
    for (key, value) in entries {
        let rendered = match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        out.push_str(&format!("{:<width$} {rendered}\n", format!("{key}:")));
    }
    out.trim_end().to_owned()
}

// ── Shared printing ─────────────────────────────────────────────────

pub fn print_devices(devices: &[Device], global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_list(
        &global.output,
        devices,
        |d| DeviceRow::new(d, color),
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_device(device: &Device, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(&global.color);
    let out = output::render_single(
        &global.output,
        device,
        |d| detail(d, color),
        |d| d.id.clone(),
    )?;
    output::print_output(&out, global.quiet);
    Ok(())
}

fn print_raw(body: &Value, global: &GlobalOpts) -> Result<(), CliError> {
    let out = output::render_single(&global.output, body, status_detail, Value::to_string)?;
    output::print_output(&out, global.quiet);
    Ok(())
}

// ── Command building ────────────────────────────────────────────────

fn fan_mode(mode: ModeArg) -> FanMode {
    match mode {
        ModeArg::Normal => FanMode::Normal,
        ModeArg::Sleep => FanMode::Sleep,
        ModeArg::Turbo => FanMode::Turbo,
    }
}

fn fan_speed(speed: u8) -> Result<FanSpeed, CliError> {
    FanSpeed::new(speed).map_err(|e| CliError::Validation {
        field: "speed".into(),
        reason: e.to_string(),
    })
}

fn build_command(
    power: Option<PowerState>,
    speed: Option<u8>,
    mode: Option<ModeArg>,
) -> Result<ControlCommand, CliError> {
    let mut cmd = ControlCommand::default();
    if let Some(power) = power {
        cmd = cmd.with_power(power.is_on());
    }
    if let Some(speed) = speed {
        cmd = cmd.with_speed(fan_speed(speed)?);
    }
    if let Some(mode) = mode {
        cmd = cmd.with_mode(fan_mode(mode));
    }
    if cmd.is_empty() {
        return Err(CliError::Validation {
            field: "command".into(),
            reason: "give at least one of --power, --speed or --mode".into(),
        });
    }
    Ok(cmd)
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(
    session: &mut Session,
    args: DevicesArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    match args.command {
        DevicesCommand::List => {
            resume(session, global).await?;
            print_devices(session.devices(), global)
        }

        DevicesCommand::Get { device } => {
            resume(session, global).await?;
            let found = session
                .device(&device)
                .ok_or(CliError::UnknownDevice { identifier: device })?;
            print_device(found, global)
        }

        DevicesCommand::Status { device } => {
            util::require_session(session)?;
            let body = util::with_spinner(
                global,
                "Fetching status",
                session.device_status(&device),
            )
            .await?;
            print_raw(&body, global)
        }

        DevicesCommand::Power { device, state } => {
            control(session, &device, &ControlCommand::power(state.is_on()), global).await
        }

        DevicesCommand::Speed { device, speed } => {
            let cmd = ControlCommand::speed(fan_speed(speed)?);
            control(session, &device, &cmd, global).await
        }

        DevicesCommand::Mode { device, mode } => {
            control(session, &device, &ControlCommand::mode(fan_mode(mode)), global).await
        }

        DevicesCommand::Set {
            device,
            power,
            speed,
            mode,
        } => {
            let cmd = build_command(power, speed, mode)?;
            control(session, &device, &cmd, global).await
        }
    }
}

async fn resume(session: &mut Session, global: &GlobalOpts) -> Result<(), CliError> {
    let logged_in = util::with_spinner(global, "Fetching fans", session.resume()).await?;
    if logged_in {
        Ok(())
    } else {
        Err(CliError::NotLoggedIn)
    }
}

/// Send `cmd`, then show the device as the follow-up refresh reports it.
async fn control(
    session: &mut Session,
    device: &str,
    cmd: &ControlCommand,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    util::require_session(session)?;
    let response = util::with_spinner(
        global,
        &format!("Sending {cmd}"),
        session.control_device(device, cmd),
    )
    .await?;

    match session.device(device) {
        Some(updated) => print_device(updated, global),
        // The refreshed list may not include the device; show the raw reply.
        None => print_raw(&response, global),
    }
}
