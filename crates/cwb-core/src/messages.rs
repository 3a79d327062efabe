//! User-facing text.
//!
//! The default wording is Traditional Chinese, matching the clinics the
//! waiting-room portal serves; English is available via `BOT_LOCALE=en`.

use std::str::FromStr;

use crate::{errors::Error, policy::Notice, session::Session, status::FailureKind};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Locale {
    #[default]
    ZhTw,
    En,
}

impl FromStr for Locale {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('_', "-").as_str() {
            "zh-tw" | "zh" | "tw" => Ok(Locale::ZhTw),
            "en" | "en-us" | "en-gb" => Ok(Locale::En),
            other => Err(Error::Config(format!("unsupported locale: {other}"))),
        }
    }
}

/// Every prompt and push the bot sends, for one locale.
#[derive(Clone, Debug)]
pub struct Messages {
    pub locale: Locale,
    pub reset_keyword: &'static str,
    pub welcome: &'static str,
    pub reset: &'static str,
    pub request_number: &'static str,
    pub invalid_url: &'static str,
    pub invalid_number: &'static str,
    pub number_saved: &'static str,
    pub system_error: &'static str,
    pub non_business_hours: &'static str,
    pub timeout: &'static str,
    pub invalid_target: &'static str,
    pub text_only: &'static str,
    pub help: &'static str,
}

const ZH_TW: Messages = Messages {
    locale: Locale::ZhTw,
    reset_keyword: "重置",
    welcome: "歡迎使用診所候診小幫手！\n請輸入掛號診所雲端候診中心網址",
    reset: "已重置您的狀態！\n請輸入掛號診所雲端候診中心網址",
    request_number: "請輸入你的號碼",
    invalid_url: "請輸入正確的網址格式！\n請從頭開始重新輸入\n請輸入掛號診所雲端候診中心網址",
    invalid_number: "請輸入正確的號碼格式！\n請從頭開始重新輸入\n請輸入掛號診所雲端候診中心網址",
    number_saved: "已成功記錄您的號碼 ✅\n\n我會持續監控診所目前看診進度\n當快輪到您時會立即通知您\n\n如果需要重新設定，\n請輸入「重置」即可重新開始",
    system_error: "系統暫時無法查詢，請稍後再試",
    non_business_hours: "目前非診所營業時間，請從頭開始重新輸入\n請輸入掛號診所雲端候診中心網址",
    timeout: "查詢超時，系統將繼續嘗試，請稍候",
    invalid_target: "網址格式錯誤，請重新輸入正確的網址\n或輸入「重置」重新開始",
    text_only: "請以文字輸入網址或號碼",
    help: "使用方式：\n1. 傳送診所雲端候診中心網址\n2. 傳送您的掛號號碼\n快輪到您時我會通知您\n\n/status 查看目前狀態\n/reset 或輸入「重置」重新開始",
};

const EN: Messages = Messages {
    locale: Locale::En,
    reset_keyword: "reset",
    welcome: "Welcome to the clinic queue helper!\nPlease send the URL of your clinic's online waiting room.",
    reset: "Your status has been reset!\nPlease send the URL of your clinic's online waiting room.",
    request_number: "Please enter your ticket number.",
    invalid_url: "That is not a valid URL.\nPlease start over and send the URL of your clinic's online waiting room.",
    invalid_number: "That is not a valid ticket number.\nPlease start over and send the URL of your clinic's online waiting room.",
    number_saved: "Your number has been recorded ✅\n\nI will keep watching the clinic's progress and let you know when your turn is close.\n\nTo start over, send \"reset\".",
    system_error: "The system cannot check the queue right now, please try again later.",
    non_business_hours: "The clinic is outside business hours. Please start over and send the URL of your clinic's online waiting room.",
    timeout: "The clinic's status page is slow to respond. I will keep trying, please wait.",
    invalid_target: "The waiting-room URL could not be read. Please send a correct URL, or send \"reset\" to start over.",
    text_only: "Please send the URL or your number as text.",
    help: "How it works:\n1. Send your clinic's waiting-room URL\n2. Send your ticket number\nI'll notify you when your turn is close.\n\n/status shows what I'm watching\n/reset or \"reset\" starts over",
};

impl Default for Messages {
    fn default() -> Self {
        Self::for_locale(Locale::default())
    }
}

impl Messages {
    pub fn for_locale(locale: Locale) -> Self {
        match locale {
            Locale::ZhTw => ZH_TW,
            Locale::En => EN,
        }
    }

    pub fn missed_number(&self, ticket: u32, current: u32) -> String {
        match self.locale {
            Locale::ZhTw => format!(
                "您的號碼 {ticket} 已經過號了！目前叫號：{current}\n系統已重置，請重新輸入掛號診所雲端候診中心網址"
            ),
            Locale::En => format!(
                "Your number {ticket} has already passed! Now serving: {current}\nYour status has been reset, please send the waiting-room URL again."
            ),
        }
    }

    pub fn approaching(&self, current: u32, ticket: u32) -> String {
        match self.locale {
            Locale::ZhTw => {
                format!("您的號碼即將到號！\n目前叫號：{current}\n您的號碼：{ticket}")
            }
            Locale::En => format!(
                "Your turn is coming up!\nNow serving: {current}\nYour number: {ticket}"
            ),
        }
    }

    pub fn at_number(&self, ticket: u32) -> String {
        match self.locale {
            Locale::ZhTw => format!(
                "您的號碼 {ticket} 已經到號了！\n系統已重置，請重新輸入掛號診所雲端候診中心網址"
            ),
            Locale::En => format!(
                "Your number {ticket} is being called now!\nYour status has been reset, please send the waiting-room URL again."
            ),
        }
    }

    pub fn already_monitoring(&self, ticket: u32) -> String {
        match self.locale {
            Locale::ZhTw => format!(
                "正在監控您的號碼 {ticket}\n快輪到您時會立即通知您\n\n如果需要重新設定，請輸入「重置」"
            ),
            Locale::En => format!(
                "I'm watching number {ticket} for you and will notify you when it's close.\n\nTo start over, send \"reset\"."
            ),
        }
    }

    /// One-line summary of where a user is in the registration flow.
    pub fn describe(&self, session: Option<&Session>) -> String {
        let Some(session) = session else {
            return match self.locale {
                Locale::ZhTw => "目前沒有設定\n請輸入掛號診所雲端候診中心網址".to_string(),
                Locale::En => {
                    "Nothing is set up yet.\nPlease send your clinic's waiting-room URL.".to_string()
                }
            };
        };

        match (&session.target_url, session.ticket_number) {
            (None, _) => match self.locale {
                Locale::ZhTw => "等待輸入候診中心網址".to_string(),
                Locale::En => "Waiting for the waiting-room URL.".to_string(),
            },
            (Some(url), None) => match self.locale {
                Locale::ZhTw => format!("網址：{url}\n等待輸入您的號碼"),
                Locale::En => format!("URL: {url}\nWaiting for your ticket number."),
            },
            (Some(url), Some(ticket)) => match self.locale {
                Locale::ZhTw => format!("網址：{url}\n您的號碼：{ticket}\n監控中"),
                Locale::En => format!("URL: {url}\nYour number: {ticket}\nMonitoring."),
            },
        }
    }

    pub fn fetch_failed(&self, kind: FailureKind) -> &'static str {
        match kind {
            FailureKind::InvalidTarget => self.invalid_target,
            FailureKind::Timeout => self.timeout,
            FailureKind::System => self.system_error,
        }
    }

    pub fn render(&self, notice: &Notice) -> String {
        match *notice {
            Notice::Missed { ticket, current } => self.missed_number(ticket, current),
            Notice::AtNumber { ticket } => self.at_number(ticket),
            Notice::Approaching { current, ticket } => self.approaching(current, ticket),
            Notice::OutsideBusinessHours => self.non_business_hours.to_string(),
            Notice::FetchFailed(kind) => self.fetch_failed(kind).to_string(),
        }
    }
}
