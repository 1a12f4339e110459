//! Sign-in form

use iocraft::prelude::*;

use crate::tui::theme::theme;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoginField {
    #[default]
    Email,
    Password,
}

impl LoginField {
    pub fn next(self) -> Self {
        match self {
            LoginField::Email => LoginField::Password,
            LoginField::Password => LoginField::Email,
        }
    }
}

#[derive(Default, Props)]
pub struct LoginFormProps {
    pub email: Option<State<String>>,
    /// Password length only; the text itself never reaches the render tree
    pub password_len: usize,
    pub focus: LoginField,
    pub submitting: bool,
    pub error: Option<String>,
    /// Show the demo account hint
    pub demo: bool,
}

pub fn mask_password(len: usize) -> String {
    "•".repeat(len)
}

#[component]
pub fn LoginForm(props: &LoginFormProps) -> impl Into<AnyElement<'static>> {
    let theme = theme();
    let border_for = |field: LoginField| {
        if props.focus == field {
            theme.border_focused
        } else {
            theme.border
        }
    };

    let Some(mut email) = props.email else {
        return element!(View);
    };

    element! {
        View(
            width: 100pct,
            height: 100pct,
            justify_content: JustifyContent::Center,
            align_items: AlignItems::Center,
        ) {
            View(
                width: 50,
                flex_direction: FlexDirection::Column,
                border_style: BorderStyle::Round,
                border_color: theme.border_focused,
                padding: 1,
            ) {
                Text(content: "Sign in to your account", color: theme.text, weight: Weight::Bold)

                View(margin_top: 1) {
                    Text(content: "Email", color: theme.text_dimmed)
                }
                View(
                    height: 3,
                    border_style: BorderStyle::Round,
                    border_color: border_for(LoginField::Email),
                    padding_left: 1,
                    padding_right: 1,
                ) {
                    TextInput(
                        value: email.to_string(),
                        has_focus: props.focus == LoginField::Email && !props.submitting,
                        on_change: move |value| email.set(value),
                        color: theme.text,
                    )
                }

                Text(content: "Password", color: theme.text_dimmed)
                View(
                    height: 3,
                    border_style: BorderStyle::Round,
                    border_color: border_for(LoginField::Password),
                    padding_left: 1,
                    padding_right: 1,
                ) {
                    Text(content: mask_password(props.password_len), color: theme.text)
                }

                #(props.error.clone().map(|error| element! {
                    Text(content: error, color: theme.error)
                }))

                View(margin_top: 1) {
                    Text(
                        content: if props.submitting { "Signing in..." } else { "Press Enter to sign in" },
                        color: theme.text_dimmed,
                    )
                }

                #(props.demo.then(|| element! {
                    View(flex_direction: FlexDirection::Column, margin_top: 1) {
                        Text(content: "Demo accounts:", color: theme.text_dimmed)
                        Text(content: "  user@example.com / password123", color: theme.id_color)
                        Text(content: "  admin@example.com / admin123", color: theme.id_color)
                    }
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_cycle() {
        assert_eq!(LoginField::Email.next(), LoginField::Password);
        assert_eq!(LoginField::Password.next(), LoginField::Email);
    }

    #[test]
    fn test_mask_password() {
        assert_eq!(mask_password(0), "");
        assert_eq!(mask_password(3).chars().count(), 3);
    }
}
