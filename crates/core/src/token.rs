//! OCR token model
//!
//! A token is one recognized word. It is produced once by the OCR engine and
//! never mutated; later stages refer to it by its position in the token list.

use serde::{Deserialize, Serialize};

/// Axis-aligned bounding box in pixel coordinates.
///
/// Serialized as `[x0, y0, x1, y1]`. Every constructor orders the corners so
/// that `x0 <= x1` and `y0 <= y1` always hold.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct BBox {
    x0: f32,
    y0: f32,
    x1: f32,
    y1: f32,
}

impl BBox {
    pub fn new(x0: f32, y0: f32, x1: f32, y1: f32) -> Self {
        Self {
            x0: x0.min(x1),
            y0: y0.min(y1),
            x1: x0.max(x1),
            y1: y0.max(y1),
        }
    }

    /// Builds a box from a top-left corner and a size, as OCR engines report it.
    pub fn from_origin_size(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self::new(left, top, left + width, top + height)
    }

    pub fn x0(&self) -> f32 {
        self.x0
    }

    pub fn y0(&self) -> f32 {
        self.y0
    }

    pub fn x1(&self) -> f32 {
        self.x1
    }

    pub fn y1(&self) -> f32 {
        self.y1
    }

    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }

    /// Grows the box by `amount` pixels on every side.
    pub fn expand(&self, amount: f32) -> Self {
        Self::new(
            self.x0 - amount,
            self.y0 - amount,
            self.x1 + amount,
            self.y1 + amount,
        )
    }
}

impl From<[f32; 4]> for BBox {
    fn from([x0, y0, x1, y1]: [f32; 4]) -> Self {
        Self::new(x0, y0, x1, y1)
    }
}

impl From<BBox> for [f32; 4] {
    fn from(bbox: BBox) -> Self {
        [bbox.x0, bbox.y0, bbox.x1, bbox.y1]
    }
}

/// One OCR-recognized word.
///
/// Deserialization goes through [`Token::new`], so inbound confidences are
/// clamped the same way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "TokenWire")]
pub struct Token {
    pub text: String,
    /// Recognition confidence, 0-100.
    #[serde(rename = "conf")]
    pub confidence: f32,
    pub bbox: BBox,
}

#[derive(Deserialize)]
struct TokenWire {
    text: String,
    #[serde(rename = "conf", default)]
    confidence: f32,
    /// Missing boxes become an empty box, which renders as nothing.
    #[serde(default)]
    bbox: BBox,
}

impl From<TokenWire> for Token {
    fn from(wire: TokenWire) -> Self {
        Token::new(wire.text, wire.confidence, wire.bbox)
    }
}

impl Token {
    pub fn new(text: impl Into<String>, confidence: f32, bbox: BBox) -> Self {
        Self {
            text: text.into(),
            confidence: confidence.clamp(0.0, 100.0),
            bbox,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bbox_orders_corners() {
        let bbox = BBox::new(50.0, 40.0, 10.0, 20.0);
        assert_eq!(bbox.x0(), 10.0);
        assert_eq!(bbox.y0(), 20.0);
        assert_eq!(bbox.x1(), 50.0);
        assert_eq!(bbox.y1(), 40.0);
        assert_eq!(bbox.width(), 40.0);
        assert_eq!(bbox.height(), 20.0);
    }

    #[test]
    fn test_token_wire_shape() {
        let token: Token =
            serde_json::from_str(r#"{"text":"Hello","conf":91.5,"bbox":[30,10,5,2]}"#).unwrap();
        assert_eq!(token.text, "Hello");
        assert_eq!(token.confidence, 91.5);
        assert_eq!(token.bbox, BBox::new(5.0, 2.0, 30.0, 10.0));

        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["bbox"], serde_json::json!([5.0, 2.0, 30.0, 10.0]));
        assert_eq!(json["conf"], serde_json::json!(91.5));
    }

    #[test]
    fn test_token_confidence_defaults_to_zero() {
        let token: Token = serde_json::from_str(r#"{"text":"x","bbox":[0,0,1,1]}"#).unwrap();
        assert_eq!(token.confidence, 0.0);

        let token: Token = serde_json::from_str(r#"{"text":"x"}"#).unwrap();
        assert_eq!(token.bbox, BBox::default());
    }

    #[test]
    fn test_inbound_confidence_is_clamped() {
        let high: Token = serde_json::from_str(r#"{"text":"x","conf":150}"#).unwrap();
        assert_eq!(high.confidence, 100.0);

        let low: Token = serde_json::from_str(r#"{"text":"x","conf":-3.5}"#).unwrap();
        assert_eq!(low.confidence, 0.0);
    }

    #[test]
    fn test_expand() {
        let bbox = BBox::from_origin_size(10.0, 10.0, 5.0, 5.0).expand(2.0);
        assert_eq!(bbox, BBox::new(8.0, 8.0, 17.0, 17.0));
    }
}
