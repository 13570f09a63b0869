//! Card payments from the terminal. The buyer completes the hosted checkout
//! for the opened order and pastes back the payment id and signature it
//! returns; a blank answer cancels.

use std::io::Write;

use async_trait::async_trait;
use bl_core::error::PaymentError;
use bl_core::payment::{CardAuthorization, CardCheckout, PendingCardOrder};
use bl_core::pricing::format_price;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::Mutex;

type Input = Box<dyn AsyncBufRead + Send + Unpin>;

pub struct PromptCheckout {
    input: Mutex<Input>,
}

impl PromptCheckout {
    pub fn stdin() -> Self {
        Self::new(BufReader::new(tokio::io::stdin()))
    }

    pub fn new(input: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            input: Mutex::new(Box::new(input)),
        }
    }
}

#[async_trait]
impl CardCheckout for PromptCheckout {
    async fn authorize(
        &self,
        order: &PendingCardOrder,
    ) -> Result<CardAuthorization, PaymentError> {
        println!(
            "Order {} is open for {}",
            order.order_id,
            format_price(order.amount / 100)
        );
        println!("  Razorpay order: {}", order.razorpay_order_id);
        if let Some(key) = &order.key_id {
            println!("  Checkout key:   {key}");
        }
        println!("Complete the card payment, then paste the ids it returns.");

        let mut input = self.input.lock().await;
        let razorpay_payment_id = read_field(&mut input, "Payment id").await?;
        let razorpay_signature = read_field(&mut input, "Signature").await?;

        Ok(CardAuthorization {
            razorpay_order_id: order.razorpay_order_id.clone(),
            razorpay_payment_id,
            razorpay_signature,
        })
    }
}

async fn read_field(input: &mut Input, label: &str) -> Result<String, PaymentError> {
    print!("{label}: ");
    let _ = std::io::stdout().flush();

    let mut line = String::new();
    input
        .read_line(&mut line)
        .await
        .map_err(|e| PaymentError::Transport(e.to_string()))?;

    match line.trim() {
        "" => Err(PaymentError::Cancelled),
        value => Ok(value.to_string()),
    }
}
