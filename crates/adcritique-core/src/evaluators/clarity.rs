//! Message clarity: product visibility, text legibility and overall message.

use std::sync::Arc;

use async_trait::async_trait;

use super::{combine, ensure_media, vision_context, Evaluator, Signal};
use crate::analyzers::{
    MessageClarity, ProductVisibility, SimilarityAnalyzer, TextLegibility, VisionAnalyzer,
    VisionReport,
};
use crate::domain::{
    Dimension, DimensionScore, EvaluationError, MediaKind, ReferenceContext, Variation,
};

const DIMENSION: Dimension = Dimension::MessageClarity;

pub struct MessageClarityEvaluator {
    similarity: Arc<dyn SimilarityAnalyzer>,
    vision: Arc<dyn VisionAnalyzer>,
}

impl MessageClarityEvaluator {
    pub fn new(similarity: Arc<dyn SimilarityAnalyzer>, vision: Arc<dyn VisionAnalyzer>) -> Self {
        Self { similarity, vision }
    }

    async fn product_signal(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
        report: &VisionReport,
    ) -> Result<Signal, EvaluationError> {
        if variation.kind == MediaKind::Video {
            return Ok(Signal::new(0.7, "Product check is approximate for video").estimated());
        }
        let Some(product) = &context.bundle.product else {
            return Ok(visibility_signal(report.product_visibility));
        };

        let found = self
            .similarity
            .similarity(&variation.media, product)
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        Ok(if found.detected {
            Signal::new((found.score * 1.1).min(1.0), "Product clearly featured")
        } else if found.score >= 0.3 {
            Signal::new(found.score * 0.8, "Product partially visible")
                .issue("Product not prominent")
                .suggest("Make the product the focal point")
        } else {
            Signal::new(found.score * 0.5, "Product not found in the ad")
                .issue("Product not visible")
                .suggest("Show the product clearly")
        })
    }
}

fn visibility_signal(visibility: ProductVisibility) -> Signal {
    match visibility {
        ProductVisibility::Clear => Signal::new(0.8, "Product appears clearly visible"),
        ProductVisibility::Partial => Signal::new(0.6, "Product only partly visible")
            .issue("Product not prominent")
            .suggest("Make the product the focal point"),
        ProductVisibility::NotVisible => Signal::new(0.4, "Product does not appear visible")
            .issue("Product not visible")
            .suggest("Show the product clearly"),
    }
}

fn text_signal(text: TextLegibility) -> Signal {
    match text {
        TextLegibility::Readable => Signal::new(1.0, "Text is clear and readable"),
        TextLegibility::MostlyReadable => Signal::new(0.7, "Text is mostly readable")
            .issue("Text partially illegible")
            .suggest("Increase text size or contrast against the background"),
        TextLegibility::Illegible => Signal::new(0.4, "Text is hard to read")
            .issue("Text illegible")
            .suggest("Rework text placement and size"),
        TextLegibility::NoText => Signal::new(0.8, "No text present"),
    }
}

fn message_signal(message: MessageClarity) -> Signal {
    match message {
        MessageClarity::Clear => Signal::new(0.9, "Message is clear"),
        MessageClarity::MostlyClear => Signal::new(0.7, "Message is mostly clear"),
        MessageClarity::Confusing => Signal::new(0.4, "Message is confusing")
            .issue("Message unclear")
            .suggest("Focus the ad on a single message"),
        MessageClarity::Inconclusive => {
            Signal::new(0.6, "Message clarity inconclusive").estimated()
        }
    }
}

#[async_trait]
impl Evaluator for MessageClarityEvaluator {
    fn dimension(&self) -> Dimension {
        DIMENSION
    }

    async fn evaluate(
        &self,
        variation: &Variation,
        context: &ReferenceContext,
    ) -> Result<DimensionScore, EvaluationError> {
        ensure_media(DIMENSION, variation)?;
        let report = self
            .vision
            .analyze(&variation.media, variation.kind, &vision_context(context))
            .await
            .map_err(|e| EvaluationError::from_analyzer(DIMENSION, e))?;
        let signals = vec![
            self.product_signal(variation, context, &report).await?,
            text_signal(report.text),
            message_signal(report.message),
        ];
        Ok(combine(DIMENSION, signals))
    }
}
