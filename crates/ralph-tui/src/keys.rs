// Copyright (c) 2024-2026 Martin Schröder <info@swedishembedded.com>
//
// SPDX-License-Identifier: MIT
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::state::Dialog;

/// All logical actions the TUI can perform, independent of key binding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    // Navigation
    Quit,
    NextTab,
    PrevTab,
    SelectNext,
    SelectPrev,
    SelectFirst,
    SelectLast,
    OpenDetail,
    OpenSubagentDetail,
    OpenErrorDetail,
    Back,
    ToggleSidebar,

    // Dialogs
    OpenSessionPicker,
    OpenShortcuts,
    OpenFilter,
    OpenInterrupt,
    DialogClose,
    PickerNext,
    PickerPrev,
    PickerSelect,
    /// Toggle the filter tag at the given 1-based position.
    FilterToggle(u8),

    // Interrupt dialog input
    InterruptChar(char),
    InterruptBackspace,
    InterruptSubmit,

    // Process control
    StartSession,
    StopSession,
    CompleteAssignment,
}

/// Map a raw key event to an [`Action`], depending on the open dialog.
///
/// While the interrupt dialog is open every other shortcut is blocked: keys
/// either edit the feedback text, submit, or cancel.
pub fn map_key(event: KeyEvent, dialog: Dialog) -> Option<Action> {
    let ctrl = event.modifiers.contains(KeyModifiers::CONTROL);

    match dialog {
        Dialog::Interrupt => {
            return match event.code {
                KeyCode::Esc => Some(Action::DialogClose),
                KeyCode::Enter => Some(Action::InterruptSubmit),
                KeyCode::Backspace => Some(Action::InterruptBackspace),
                KeyCode::Char('c') if ctrl => Some(Action::DialogClose),
                KeyCode::Char(c) if !ctrl => Some(Action::InterruptChar(c)),
                _ => None,
            };
        }
        Dialog::SessionPicker => {
            return match event.code {
                KeyCode::Esc | KeyCode::Char('q') => Some(Action::DialogClose),
                KeyCode::Down | KeyCode::Char('j') => Some(Action::PickerNext),
                KeyCode::Up | KeyCode::Char('k') => Some(Action::PickerPrev),
                KeyCode::Enter => Some(Action::PickerSelect),
                _ => None,
            };
        }
        Dialog::Filter => {
            return match event.code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('f') => {
                    Some(Action::DialogClose)
                }
                KeyCode::Char(c @ '1'..='8') => {
                    Some(Action::FilterToggle(c as u8 - b'0'))
                }
                _ => None,
            };
        }
        Dialog::Shortcuts => {
            return match event.code {
                KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('?') | KeyCode::Enter => {
                    Some(Action::DialogClose)
                }
                _ => None,
            };
        }
        Dialog::None => {}
    }

    match event.code {
        KeyCode::Char('q') => Some(Action::Quit),
        KeyCode::Char('c') if ctrl => Some(Action::Quit),

        KeyCode::Tab | KeyCode::Right | KeyCode::Char('l') => Some(Action::NextTab),
        KeyCode::BackTab | KeyCode::Left | KeyCode::Char('h') => Some(Action::PrevTab),

        KeyCode::Down | KeyCode::Char('j') => Some(Action::SelectNext),
        KeyCode::Up | KeyCode::Char('k') => Some(Action::SelectPrev),
        KeyCode::Char('g') | KeyCode::Home => Some(Action::SelectFirst),
        KeyCode::Char('G') | KeyCode::End => Some(Action::SelectLast),

        KeyCode::Enter => Some(Action::OpenDetail),
        KeyCode::Char('t') => Some(Action::OpenSubagentDetail),
        KeyCode::Char('e') => Some(Action::OpenErrorDetail),
        KeyCode::Esc | KeyCode::Backspace => Some(Action::Back),

        KeyCode::Char('b') => Some(Action::ToggleSidebar),
        KeyCode::Char('p') => Some(Action::OpenSessionPicker),
        KeyCode::Char('?') => Some(Action::OpenShortcuts),
        KeyCode::Char('f') => Some(Action::OpenFilter),

        KeyCode::Char('n') => Some(Action::StartSession),
        KeyCode::Char('x') => Some(Action::StopSession),
        KeyCode::Char('i') => Some(Action::OpenInterrupt),
        KeyCode::Char('d') => Some(Action::CompleteAssignment),

        _ => None,
    }
}

// ─── Unit tests ──────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyEventKind;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent {
            code,
            modifiers: KeyModifiers::NONE,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent {
            code: KeyCode::Char(c),
            modifiers: KeyModifiers::CONTROL,
            kind: KeyEventKind::Press,
            state: crossterm::event::KeyEventState::NONE,
        }
    }

    #[test]
    fn q_quits_outside_dialogs() {
        assert_eq!(map_key(key(KeyCode::Char('q')), Dialog::None), Some(Action::Quit));
    }

    #[test]
    fn interrupt_dialog_blocks_global_shortcuts() {
        // 'q' must not quit while typing feedback
        assert_eq!(
            map_key(key(KeyCode::Char('q')), Dialog::Interrupt),
            Some(Action::InterruptChar('q'))
        );
        // 'n' must not start a session
        assert_eq!(
            map_key(key(KeyCode::Char('n')), Dialog::Interrupt),
            Some(Action::InterruptChar('n'))
        );
        assert_eq!(
            map_key(key(KeyCode::Enter), Dialog::Interrupt),
            Some(Action::InterruptSubmit)
        );
        assert_eq!(
            map_key(key(KeyCode::Esc), Dialog::Interrupt),
            Some(Action::DialogClose)
        );
    }

    #[test]
    fn ctrl_c_quits_only_outside_interrupt() {
        assert_eq!(map_key(ctrl('c'), Dialog::None), Some(Action::Quit));
        assert_eq!(map_key(ctrl('c'), Dialog::Interrupt), Some(Action::DialogClose));
    }

    #[test]
    fn picker_navigation() {
        assert_eq!(
            map_key(key(KeyCode::Char('j')), Dialog::SessionPicker),
            Some(Action::PickerNext)
        );
        assert_eq!(
            map_key(key(KeyCode::Enter), Dialog::SessionPicker),
            Some(Action::PickerSelect)
        );
        assert_eq!(
            map_key(key(KeyCode::Esc), Dialog::SessionPicker),
            Some(Action::DialogClose)
        );
    }

    #[test]
    fn filter_dialog_toggles_by_number() {
        assert_eq!(
            map_key(key(KeyCode::Char('3')), Dialog::Filter),
            Some(Action::FilterToggle(3))
        );
        assert_eq!(map_key(key(KeyCode::Char('9')), Dialog::Filter), None);
    }

    #[test]
    fn vim_style_navigation() {
        assert_eq!(map_key(key(KeyCode::Char('j')), Dialog::None), Some(Action::SelectNext));
        assert_eq!(map_key(key(KeyCode::Char('k')), Dialog::None), Some(Action::SelectPrev));
        assert_eq!(map_key(key(KeyCode::Char('G')), Dialog::None), Some(Action::SelectLast));
    }
}
