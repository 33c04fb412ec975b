// Stacked LSTM over one-hot windows.
//
// The network is stateless across batches: every window starts from
// a zero hidden and cell state, and no state is carried from one
// batch to the next. The hidden size is its own setting and does
// not depend on the batch size.

use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
        Lstm, LstmConfig,
    },
    prelude::*,
};

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize
// internally — do NOT add them again or you get conflicting impls.
#[derive(Config, Debug)]
pub struct CharRnnConfig {
    pub vocab_size:  usize,
    pub hidden_size: usize,
    pub num_layers:  usize,
    #[config(default = 0.2)]
    pub dropout:     f64,
}

impl CharRnnConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> CharRnn<B> {
        // First layer reads one-hot characters, the rest read hidden states
        let layers: Vec<Lstm<B>> = (0..self.num_layers)
            .map(|i| {
                let d_input = if i == 0 { self.vocab_size } else { self.hidden_size };
                LstmConfig::new(d_input, self.hidden_size, true).init(device)
            })
            .collect();
        let dropout = DropoutConfig::new(self.dropout).init();
        let output  = LinearConfig::new(self.hidden_size, self.vocab_size).init(device);
        CharRnn { layers, dropout, output }
    }
}

#[derive(Module, Debug)]
pub struct CharRnn<B: Backend> {
    pub layers:  Vec<Lstm<B>>,
    pub dropout: Dropout,
    pub output:  Linear<B>,
}

impl<B: Backend> CharRnn<B> {
    /// inputs: [batch, window, vocab] one-hot → logits: [batch, vocab]
    pub fn forward(&self, inputs: Tensor<B, 3>) -> Tensor<B, 2> {
        let mut x = inputs;
        for layer in &self.layers {
            // Every window starts from a zero state
            let (out, _state) = layer.forward(x, None);
            x = self.dropout.forward(out);
        }

        // Only the last time step predicts the next character.
        let [batch_size, window, hidden] = x.dims();
        let last = x
            .slice([0..batch_size, window - 1..window, 0..hidden])
            .reshape([batch_size, hidden]);

        self.output.forward(last)
    }

    /// targets: [batch] character indices → (mean cross-entropy, logits)
    pub fn forward_loss(
        &self,
        inputs:  Tensor<B, 3>,
        targets: Tensor<B, 1, Int>,
    ) -> (Tensor<B, 1>, Tensor<B, 2>) {
        let logits = self.forward(inputs);
        let ce = CrossEntropyLossConfig::new().init(&logits.device());
        let loss = ce.forward(logits.clone(), targets);
        (loss, logits)
    }
}
