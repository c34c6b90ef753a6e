//! Incoming text messages.
//!
//! With `+CNMI=2,2` the modem pushes every message as a `+CMT:` header line
//! followed by the text. Those lines may arrive in the middle of any
//! exchange; the channel sets them aside and [`Sms`] picks them up.

use embassy_time::Duration;
use embedded_io_async::{Read, Write};
use heapless::Vec;

use crate::channel::{AtHandle, Notification, NOTIFICATION_CAPACITY};
use crate::command::sms::types::{
    IndicationMode, MessageFormat, MessageIndication, ShowTextParameters,
};
use crate::command::sms::{SetMessageFormat, SetNewMessageIndication, SetShowTextParameters};
use crate::command::Oob;
use crate::error::Error;
use crate::state::State;

pub struct Sms<'d, T> {
    state: &'d State<'d, T>,
    at: AtHandle<'d, T>,
}

impl<'d, T: Read + Write> Sms<'d, T> {
    pub fn new(state: &'d State<'d, T>) -> Self {
        Self {
            state,
            at: state.at(),
        }
    }

    /// Switch to text mode and have messages delivered directly.
    pub async fn listen(&mut self) -> Result<(), Error> {
        let mut tx = self.at.lock().await;
        tx.execute(&SetMessageFormat {
            mode: MessageFormat::Text,
        })
        .await?;
        tx.execute(&SetShowTextParameters {
            show: ShowTextParameters::Shown,
        })
        .await?;
        tx.execute(&SetNewMessageIndication {
            mode: IndicationMode::BufferWhenReserved,
            mt: MessageIndication::Direct,
        })
        .await?;
        info!("Listening for text messages");
        Ok(())
    }

    /// Hand every delivered message to `callback`, forever.
    ///
    /// Wakes whenever a transaction captured a `+CMT:` line. Bytes that no
    /// transaction looked at yet are picked up by the event runner's scans.
    pub async fn run(&mut self, mut callback: impl FnMut(&str)) -> ! {
        loop {
            self.state.oob_signal(Oob::SmsDelivery).wait().await;
            self.poll_messages(&mut callback).await;
        }
    }

    /// One pass over the channel, returns the number of messages seen.
    pub async fn poll_messages(&mut self, mut callback: impl FnMut(&str)) -> usize {
        let mut messages: Vec<Notification, NOTIFICATION_CAPACITY> = Vec::new();
        {
            let mut tx = self.at.lock().await;
            tx.set_timeout(Duration::from_ticks(0));
            if let Err(e) = tx.scan().await {
                warn!("Scanning for messages failed: {:?}", e);
            }
            while let Some(message) = tx.take_notification(Oob::SmsDelivery) {
                messages.push(message).ok();
            }
        }
        self.state.oob_signal(Oob::SmsDelivery).reset();

        for message in &messages {
            callback(message_text(message));
        }
        messages.len()
    }
}

/// The text of a `+CMT:` notification. The channel already cut the body to
/// the announced length; a character split by that cut is dropped.
fn message_text(message: &Notification) -> &str {
    match core::str::from_utf8(&message.body) {
        Ok(text) => text,
        Err(e) => {
            debug!("Message text cut at byte {}", e.valid_up_to());
            core::str::from_utf8(&message.body[..e.valid_up_to()]).unwrap_or_default()
        }
    }
}
