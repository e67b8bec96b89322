use gilrs::{Axis, Button, Event, EventType, GamepadId, Gilrs};

use crate::error::ControllerError;

pub const LEFT_X: usize = 0;
pub const LEFT_Y: usize = 1;
pub const RIGHT_X: usize = 2;
pub const RIGHT_Y: usize = 3;
pub const LEFT_TRIGGER: usize = 4;
pub const RIGHT_TRIGGER: usize = 5;
pub const A: usize = 6;
pub const B: usize = 7;
pub const X: usize = 8;
pub const Y: usize = 9;
pub const LEFT_BUMPER: usize = 10;
pub const RIGHT_BUMPER: usize = 11;
pub const LEFT_THUMB: usize = 12;
pub const RIGHT_THUMB: usize = 13;
pub const START: usize = 14;
pub const BACK: usize = 15;
pub const SLOTS: usize = 16;

/// One poll of the controller in the fixed Xbox layout. Sticks read -100..=100
/// with up and right positive, triggers 0..=100, buttons 0 or 1.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControllerReading(pub [i32; SLOTS]);

impl ControllerReading {
    pub fn get(&self, slot: usize) -> i32 {
        self.0.get(slot).copied().unwrap_or(0)
    }

    pub fn left_stick(&self) -> (i32, i32) {
        (self.0[LEFT_X], self.0[LEFT_Y])
    }

    pub fn right_stick(&self) -> (i32, i32) {
        (self.0[RIGHT_X], self.0[RIGHT_Y])
    }

    pub fn start(&self) -> bool {
        self.0[START] != 0
    }
}

pub trait ControllerReader {
    fn read(&mut self) -> Result<ControllerReading, ControllerError>;
}

pub(crate) fn normalize_axis(v: f32) -> i32 {
    (v.clamp(-1.0, 1.0) * 100.0).round() as i32
}

pub(crate) fn normalize_trigger(v: f32) -> i32 {
    (v.clamp(0.0, 1.0) * 100.0).round() as i32
}

/// gilrs-backed reader. Follows whichever gamepad produced the latest event.
pub struct GamepadReader {
    gilrs: Gilrs,
    active: Option<GamepadId>,
}

impl GamepadReader {
    pub fn new() -> Result<Self, ControllerError> {
        let gilrs = Gilrs::new().map_err(|e| ControllerError::Init(e.to_string()))?;
        for (_id, gamepad) in gilrs.gamepads() {
            tracing::info!("{} is {:?}", gamepad.name(), gamepad.power_info());
        }
        Ok(Self {
            gilrs,
            active: None,
        })
    }

    fn pump_events(&mut self) {
        while let Some(Event { id, event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => {
                    tracing::info!("gamepad {} connected", self.gilrs.gamepad(id).name());
                    self.active = Some(id);
                }
                EventType::Disconnected => {
                    tracing::warn!("gamepad {} disconnected", self.gilrs.gamepad(id).name());
                    if self.active == Some(id) {
                        self.active = None;
                    }
                }
                _ => self.active = Some(id),
            }
        }
    }
}

impl ControllerReader for GamepadReader {
    fn read(&mut self) -> Result<ControllerReading, ControllerError> {
        self.pump_events();

        let id = match self.active {
            Some(id) if self.gilrs.gamepad(id).is_connected() => id,
            _ => self
                .gilrs
                .gamepads()
                .find(|(_, g)| g.is_connected())
                .map(|(id, _)| id)
                .ok_or(ControllerError::NoGamepad)?,
        };
        self.active = Some(id);
        let pad = self.gilrs.gamepad(id);

        let trigger = |b: Button| {
            pad.button_data(b)
                .map(|d| normalize_trigger(d.value()))
                .unwrap_or(0)
        };
        let button = |b: Button| i32::from(pad.is_pressed(b));

        let mut r = [0; SLOTS];
        r[LEFT_X] = normalize_axis(pad.value(Axis::LeftStickX));
        r[LEFT_Y] = normalize_axis(pad.value(Axis::LeftStickY));
        r[RIGHT_X] = normalize_axis(pad.value(Axis::RightStickX));
        r[RIGHT_Y] = normalize_axis(pad.value(Axis::RightStickY));
        r[LEFT_TRIGGER] = trigger(Button::LeftTrigger2);
        r[RIGHT_TRIGGER] = trigger(Button::RightTrigger2);
        r[A] = button(Button::South);
        r[B] = button(Button::East);
        r[X] = button(Button::West);
        r[Y] = button(Button::North);
        r[LEFT_BUMPER] = button(Button::LeftTrigger);
        r[RIGHT_BUMPER] = button(Button::RightTrigger);
        r[LEFT_THUMB] = button(Button::LeftThumb);
        r[RIGHT_THUMB] = button(Button::RightThumb);
        r[START] = button(Button::Start);
        r[BACK] = button(Button::Select);
        Ok(ControllerReading(r))
    }
}
