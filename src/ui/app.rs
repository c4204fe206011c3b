use std::collections::HashMap;

use crossterm::event::KeyCode;

use crate::config::ControlDefaults;
use crate::controls::OrderOutcome;
use crate::types::{PanelKind, PanelUpdate, Side};

/// Control actions requested from the keyboard; the runtime loop dispatches
/// them onto `Controls`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Command {
    Quit,
    StartLoop(f64),
    StopLoop,
    TickOnce,
    SetEps(f64),
    SetStake(f64),
    PreviewOrder(Side, f64),
    SubmitOrder(Side, f64),
    ApplyRisk(f64),
}

/// Numeric fields editable through the one-line prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptField {
    Interval,
    Eps,
    Stake,
    Fraction,
    StakeCap,
}

impl PromptField {
    pub fn label(&self) -> &'static str {
        match self {
            PromptField::Interval => "interval (s)",
            PromptField::Eps => "eps",
            PromptField::Stake => "stake",
            PromptField::Fraction => "fraction",
            PromptField::StakeCap => "stake cap (%)",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Prompt {
    pub field: PromptField,
    pub buffer: String,
}

/// Current values behind the control key bindings, seeded from config.
#[derive(Debug, Clone)]
pub struct ControlForm {
    pub side: Side,
    pub fraction: f64,
    pub eps: f64,
    pub stake: f64,
    pub interval: f64,
    pub stake_cap_pct: f64,
}

impl ControlForm {
    pub fn from_defaults(defaults: &ControlDefaults) -> Self {
        Self {
            side: Side::Buy,
            fraction: defaults.fraction,
            eps: defaults.eps,
            stake: defaults.stake,
            interval: defaults.interval,
            stake_cap_pct: defaults.stake_cap_pct,
        }
    }
}

/// View-side state: the latest update per panel, the order output region,
/// control inputs and the prompt. Holds no fetch logic.
pub struct App {
    panels: HashMap<PanelKind, PanelUpdate>,
    order_out: Option<OrderOutcome>,
    pub form: ControlForm,
    pub prompt: Option<Prompt>,
    pub should_quit: bool,
}

impl App {
    pub fn new(defaults: &ControlDefaults) -> Self {
        Self {
            panels: HashMap::new(),
            order_out: None,
            form: ControlForm::from_defaults(defaults),
            prompt: None,
            should_quit: false,
        }
    }

    pub fn apply_update(&mut self, update: PanelUpdate) {
        self.panels.insert(update.kind, update);
    }

    pub fn panel(&self, kind: PanelKind) -> Option<&PanelUpdate> {
        self.panels.get(&kind)
    }

    pub fn set_order_outcome(&mut self, outcome: OrderOutcome) {
        self.order_out = Some(outcome);
    }

    pub fn order_outcome(&self) -> Option<&OrderOutcome> {
        self.order_out.as_ref()
    }

    /// Deterministic status aggregation: count panels whose latest update
    /// failed.
    pub fn status_line(&self) -> String {
        if self.panels.is_empty() {
            return "connecting...".to_string();
        }
        let errors = self
            .panels
            .values()
            .filter(|u| u.result.is_err())
            .count();
        if errors == 0 {
            "OK".to_string()
        } else {
            format!("OK ({} panels retrying)", errors)
        }
    }

    /// Translates a key press into a control command. Returns `None` when the
    /// key only changed local state (prompt editing, side toggle).
    pub fn handle_key(&mut self, key: KeyCode) -> Option<Command> {
        if self.prompt.is_some() {
            return self.handle_prompt_key(key);
        }

        match key {
            KeyCode::Char('q') | KeyCode::Esc => Some(Command::Quit),
            KeyCode::Char('s') => Some(Command::StartLoop(self.form.interval)),
            KeyCode::Char('x') => Some(Command::StopLoop),
            KeyCode::Char('t') => Some(Command::TickOnce),
            KeyCode::Char('b') => {
                self.form.side = match self.form.side {
                    Side::Buy => Side::Sell,
                    Side::Sell => Side::Exit,
                    Side::Exit => Side::Buy,
                };
                None
            }
            KeyCode::Char('p') => Some(Command::PreviewOrder(self.form.side, self.form.fraction)),
            KeyCode::Char('o') => Some(Command::SubmitOrder(self.form.side, self.form.fraction)),
            KeyCode::Char('i') => self.open_prompt(PromptField::Interval, self.form.interval),
            KeyCode::Char('e') => self.open_prompt(PromptField::Eps, self.form.eps),
            KeyCode::Char('k') => self.open_prompt(PromptField::Stake, self.form.stake),
            KeyCode::Char('f') => self.open_prompt(PromptField::Fraction, self.form.fraction),
            KeyCode::Char('r') => self.open_prompt(PromptField::StakeCap, self.form.stake_cap_pct),
            _ => None,
        }
    }

    fn open_prompt(&mut self, field: PromptField, current: f64) -> Option<Command> {
        self.prompt = Some(Prompt {
            field,
            buffer: current.to_string(),
        });
        None
    }

    fn handle_prompt_key(&mut self, key: KeyCode) -> Option<Command> {
        match key {
            KeyCode::Esc => {
                self.prompt = None;
                None
            }
            KeyCode::Backspace => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.buffer.pop();
                }
                None
            }
            KeyCode::Char(c) if c.is_ascii_digit() || c == '.' => {
                if let Some(prompt) = self.prompt.as_mut() {
                    prompt.buffer.push(c);
                }
                None
            }
            KeyCode::Enter => {
                let prompt = self.prompt.take()?;
                let value: f64 = prompt.buffer.trim().parse().ok()?;
                match prompt.field {
                    PromptField::Interval => {
                        self.form.interval = value;
                        None
                    }
                    PromptField::Fraction => {
                        self.form.fraction = value;
                        None
                    }
                    PromptField::Eps => {
                        self.form.eps = value;
                        Some(Command::SetEps(value))
                    }
                    PromptField::Stake => {
                        self.form.stake = value;
                        Some(Command::SetStake(value))
                    }
                    PromptField::StakeCap => {
                        self.form.stake_cap_pct = value;
                        Some(Command::ApplyRisk(value))
                    }
                }
            }
            _ => None,
        }
    }
}
