//! Character-level LSTM.
//!
//! The prompt is read one character at a time, then a separator token, and
//! the network is trained to continue with the answer followed by an end
//! token. Inference feeds the prompt and greedily decodes the answer.

use burn::grad_clipping::GradientClippingConfig;
use burn::module::{AutodiffModule, Module};
use burn::nn::loss::CrossEntropyLossConfig;
use burn::nn::{Embedding, EmbeddingConfig, Linear, LinearConfig, Lstm, LstmConfig, LstmState};
use burn::optim::{AdamWConfig, GradientsParams, Optimizer};
use burn::record::{FullPrecisionSettings, Record};
use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Int, Tensor};
use burn_autodiff::Autodiff;
use burn_ndarray::{NdArray, NdArrayDevice};
use serde::{Deserialize, Serialize};

use crate::error::{BotError, Result};
use crate::types::TrainingExample;

use super::SequenceModel;

type Infer = NdArray<f32>;
type Train = Autodiff<Infer>;

const END: usize = 0;
const SEPARATOR: usize = 1;
const UNKNOWN: usize = 2;
const FIRST_PRINTABLE: u8 = b' ';
const LAST_PRINTABLE: u8 = b'~';
const CONTROL_TOKENS: usize = 3;

pub const VOCAB_SIZE: usize = CONTROL_TOKENS + (LAST_PRINTABLE - FIRST_PRINTABLE) as usize + 1;
pub const DEFAULT_HIDDEN_SIZE: usize = 32;
const EMBED_SIZE: usize = 16;
const DEFAULT_SEED: u64 = 0x6c69_7662_6f74;

const LEARNING_RATE: f64 = 1e-2;
const GRADIENT_CLIP: f32 = 5.0;
const MAX_OUTPUT_CHARS: usize = 300;

/// Embedding, one LSTM layer, projection back onto the vocabulary.
#[derive(Module, Debug)]
struct LstmNet<B: Backend> {
    embedding: Embedding<B>,
    lstm: Lstm<B>,
    output: Linear<B>,
}

impl<B: Backend> LstmNet<B> {
    fn new(hidden_size: usize, device: &B::Device) -> Self {
        Self {
            embedding: EmbeddingConfig::new(VOCAB_SIZE, EMBED_SIZE).init(device),
            lstm: LstmConfig::new(EMBED_SIZE, hidden_size, true).init(device),
            output: LinearConfig::new(hidden_size, VOCAB_SIZE).init(device),
        }
    }

    /// tokens: [1, T] -> logits [1, T, V]
    fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        state: Option<LstmState<B, 2>>,
    ) -> (Tensor<B, 3>, LstmState<B, 2>) {
        let x = self.embedding.forward(tokens);
        let (h, state) = self.lstm.forward(x, state);
        (self.output.forward(h), state)
    }

    /// Every weight's actual shape next to the one `hidden_size` calls for.
    fn shapes(&self, hidden_size: usize) -> Vec<([usize; 2], [usize; 2])> {
        let mut shapes = vec![
            (
                self.embedding.weight.val().dims(),
                [VOCAB_SIZE, EMBED_SIZE],
            ),
            (
                self.output.weight.val().dims(),
                [hidden_size, VOCAB_SIZE],
            ),
        ];
        for gate in [
            &self.lstm.input_gate,
            &self.lstm.forget_gate,
            &self.lstm.output_gate,
            &self.lstm.cell_gate,
        ] {
            shapes.push((
                gate.input_transform.weight.val().dims(),
                [EMBED_SIZE, hidden_size],
            ));
            shapes.push((
                gate.hidden_transform.weight.val().dims(),
                [hidden_size, hidden_size],
            ));
        }
        shapes
    }
}

type Weights = <LstmNetRecord<Train> as Record<Train>>::Item<FullPrecisionSettings>;

#[derive(Serialize, Deserialize)]
struct Snapshot<W> {
    hidden_size: usize,
    vocab_size: usize,
    examples_seen: u64,
    weights: W,
}

#[derive(Debug, Clone)]
pub struct CharLstm {
    hidden_size: usize,
    examples_seen: u64,
    net: LstmNet<Train>,
    device: NdArrayDevice,
}

impl Default for CharLstm {
    fn default() -> Self {
        Self::new(DEFAULT_HIDDEN_SIZE, DEFAULT_SEED)
    }
}

impl CharLstm {
    /// Fresh network with weights drawn after seeding the backend.
    pub fn new(hidden_size: usize, seed: u64) -> Self {
        let device = NdArrayDevice::default();
        <Train as Backend>::seed(seed);
        Self {
            hidden_size,
            examples_seen: 0,
            net: LstmNet::new(hidden_size, &device),
            device,
        }
    }

    #[cfg(test)]
    pub(crate) fn examples_seen(&self) -> u64 {
        self.examples_seen
    }

    fn tokens<B: Backend>(ids: &[usize], device: &B::Device) -> Tensor<B, 2, Int> {
        let ints: Vec<i32> = ids.iter().filter_map(|&t| i32::try_from(t).ok()).collect();
        let len = ints.len();
        Tensor::<B, 1, Int>::from_ints(ints.as_slice(), device).reshape([1, len])
    }

    /// Most likely token after the last step of `logits` [1, T, V].
    fn next_token<B: Backend>(logits: Tensor<B, 3>) -> usize {
        let [_, steps, vocab] = logits.dims();
        let last = logits.slice([0..1, steps - 1..steps, 0..vocab]).reshape([vocab]);
        let token = last.argmax(0).into_scalar().elem::<i64>();
        usize::try_from(token).unwrap_or(END)
    }
}

impl SequenceModel for CharLstm {
    fn run(&self, input: &str) -> String {
        if self.examples_seen == 0 {
            return String::new();
        }

        let net = self.net.valid();
        let device = &self.device;
        let prompt: Vec<usize> = encode(input).chain(std::iter::once(SEPARATOR)).collect();

        let (mut logits, mut state) = net.forward(Self::tokens::<Infer>(&prompt, device), None);
        let mut output = String::new();
        for _ in 0..MAX_OUTPUT_CHARS {
            let token = Self::next_token(logits);
            if token == END || token == SEPARATOR {
                break;
            }
            if let Some(c) = decode(token) {
                output.push(c);
            }
            (logits, state) = net.forward(Self::tokens::<Infer>(&[token], device), Some(state));
        }
        output
    }

    fn train(&mut self, example: &TrainingExample, iterations: usize) -> f64 {
        let sequence: Vec<usize> = encode(&example.input)
            .chain(std::iter::once(SEPARATOR))
            .chain(encode(&example.output))
            .chain(std::iter::once(END))
            .collect();
        let steps = sequence.len() - 1;
        let inputs = Self::tokens::<Train>(&sequence[..steps], &self.device);
        let targets = Self::tokens::<Train>(&sequence[1..], &self.device).reshape([steps]);

        let criterion = CrossEntropyLossConfig::new().init::<Train>(&self.device);
        let mut optimizer = AdamWConfig::new()
            .with_grad_clipping(Some(GradientClippingConfig::Norm(GRADIENT_CLIP)))
            .init::<Train, LstmNet<Train>>();

        // Work on a copy so the live weights only ever see a finished run.
        let mut net = self.net.clone();
        let mut loss = 0.0;
        for _ in 0..iterations {
            let (logits, _) = net.forward(inputs.clone(), None);
            let batch_loss = criterion.forward(logits.reshape([steps, VOCAB_SIZE]), targets.clone());
            loss = batch_loss.clone().into_scalar().elem::<f64>();

            let grads = GradientsParams::from_grads(batch_loss.backward(), &net);
            net = optimizer.step(LEARNING_RATE, net, grads);
        }

        self.net = net;
        self.examples_seen += 1;
        loss
    }

    fn to_json(&self) -> Result<String> {
        let snapshot = Snapshot {
            hidden_size: self.hidden_size,
            vocab_size: VOCAB_SIZE,
            examples_seen: self.examples_seen,
            weights: self.net.clone().into_record().into_item::<FullPrecisionSettings>(),
        };
        Ok(serde_json::to_string(&snapshot)?)
    }

    fn load_json(&mut self, blob: &str) -> Result<()> {
        let snapshot: Snapshot<Weights> = serde_json::from_str(blob)?;
        if snapshot.vocab_size != VOCAB_SIZE {
            return Err(BotError::ModelState(format!(
                "vocabulary size {} is not {VOCAB_SIZE}",
                snapshot.vocab_size
            )));
        }

        let record = LstmNetRecord::<Train>::from_item(snapshot.weights, &self.device);
        let net = LstmNet::<Train>::new(snapshot.hidden_size, &self.device).load_record(record);
        for (actual, expected) in net.shapes(snapshot.hidden_size) {
            if actual != expected {
                return Err(BotError::ModelState(format!(
                    "weights of shape {actual:?} do not match hidden size {} (expected {expected:?})",
                    snapshot.hidden_size
                )));
            }
        }

        self.hidden_size = snapshot.hidden_size;
        self.examples_seen = snapshot.examples_seen;
        self.net = net;
        Ok(())
    }
}

fn encode(text: &str) -> impl Iterator<Item = usize> + '_ {
    text.chars().map(|c| match u8::try_from(c) {
        Ok(b) if (FIRST_PRINTABLE..=LAST_PRINTABLE).contains(&b) => {
            CONTROL_TOKENS + usize::from(b - FIRST_PRINTABLE)
        }
        _ => UNKNOWN,
    })
}

fn decode(token: usize) -> Option<char> {
    let offset = token.checked_sub(CONTROL_TOKENS)?;
    let byte = u8::try_from(offset).ok()?.checked_add(FIRST_PRINTABLE)?;
    (byte <= LAST_PRINTABLE).then_some(char::from(byte))
}
