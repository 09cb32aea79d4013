use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::time::Duration;

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Tune {
    SpeedFactor(f64),
    BaseTimeScale(f64),
    TopWhiten(f64),
    BottomBoost(f64),
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) enum Action {
    Quit,
    TogglePlayback,
    Reload,
    Year(i32),
    Tune(Tune),
    HelpToggle,
    ChartToggle,
    Resized,
}

#[derive(Clone, Debug)]
pub(crate) enum InputEvent {
    Key { key: KeyCode, mods: KeyModifiers },
    Resize,
}

pub(crate) fn collect_input_nonblocking(max_frame_time: Duration) -> anyhow::Result<Vec<InputEvent>> {
    let mut out = Vec::new();

    let timeout = std::cmp::min(Duration::from_millis(1), max_frame_time);
    while event::poll(timeout)? {
        match event::read()? {
            Event::Key(k) if k.kind == KeyEventKind::Press || k.kind == KeyEventKind::Repeat => {
                out.push(InputEvent::Key {
                    key: k.code,
                    mods: k.modifiers,
                });
                if out.len() >= 32 {
                    break;
                }
            }
            Event::Resize(_, _) => out.push(InputEvent::Resize),
            _ => {}
        }
    }
    Ok(out)
}

pub(crate) fn map_event_to_action(ev: InputEvent) -> Option<Action> {
    let (key, mods) = match ev {
        InputEvent::Resize => return Some(Action::Resized),
        InputEvent::Key { key, mods } => (key, mods),
    };

    if key == KeyCode::Char('c') && mods.contains(KeyModifiers::CONTROL) {
        return Some(Action::Quit);
    }

    match key {
        KeyCode::Char('q') | KeyCode::Char('Q') | KeyCode::Esc => Some(Action::Quit),
        KeyCode::Char(' ') => Some(Action::TogglePlayback),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(Action::Reload),
        KeyCode::Char('h') | KeyCode::Char('H') => Some(Action::HelpToggle),
        KeyCode::Char('c') | KeyCode::Char('C') => Some(Action::ChartToggle),

        KeyCode::Char('[') => Some(Action::Year(-1)),
        KeyCode::Char(']') => Some(Action::Year(1)),
        KeyCode::Char('{') => Some(Action::Year(-10)),
        KeyCode::Char('}') => Some(Action::Year(10)),

        KeyCode::Up => Some(Action::Tune(Tune::SpeedFactor(1.2))),
        KeyCode::Down => Some(Action::Tune(Tune::SpeedFactor(0.8))),
        KeyCode::Right => Some(Action::Tune(Tune::BaseTimeScale(1.2))),
        KeyCode::Left => Some(Action::Tune(Tune::BaseTimeScale(0.8))),
        KeyCode::Char('w') | KeyCode::Char('W') => Some(Action::Tune(Tune::TopWhiten(0.05))),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(Action::Tune(Tune::TopWhiten(-0.05))),
        KeyCode::Char('e') | KeyCode::Char('E') => Some(Action::Tune(Tune::BottomBoost(0.05))),
        KeyCode::Char('d') | KeyCode::Char('D') => Some(Action::Tune(Tune::BottomBoost(-0.05))),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(c: KeyCode) -> InputEvent {
        InputEvent::Key {
            key: c,
            mods: KeyModifiers::NONE,
        }
    }

    #[test]
    fn test_playback_keys() {
        assert_eq!(map_event_to_action(key(KeyCode::Char(' '))), Some(Action::TogglePlayback));
        assert_eq!(map_event_to_action(key(KeyCode::Char('r'))), Some(Action::Reload));
        assert_eq!(map_event_to_action(key(KeyCode::Esc)), Some(Action::Quit));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let ev = InputEvent::Key {
            key: KeyCode::Char('c'),
            mods: KeyModifiers::CONTROL,
        };
        assert_eq!(map_event_to_action(ev), Some(Action::Quit));
        assert_eq!(map_event_to_action(key(KeyCode::Char('c'))), Some(Action::ChartToggle));
    }

    #[test]
    fn test_tuning_keys() {
        assert_eq!(
            map_event_to_action(key(KeyCode::Up)),
            Some(Action::Tune(Tune::SpeedFactor(1.2)))
        );
        assert_eq!(
            map_event_to_action(key(KeyCode::Left)),
            Some(Action::Tune(Tune::BaseTimeScale(0.8)))
        );
        assert_eq!(
            map_event_to_action(key(KeyCode::Char('d'))),
            Some(Action::Tune(Tune::BottomBoost(-0.05)))
        );
    }

    #[test]
    fn test_year_keys_and_resize() {
        assert_eq!(map_event_to_action(key(KeyCode::Char('}'))), Some(Action::Year(10)));
        assert_eq!(map_event_to_action(InputEvent::Resize), Some(Action::Resized));
    }
}
