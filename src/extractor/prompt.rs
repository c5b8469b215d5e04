//! Instruction template for listing extraction

/// Placeholder replaced by the post text
const POST_PLACEHOLDER: &str = "{post}";

const TEMPLATE: &str = r#"Convert the following rental post into JSON with exactly this structure.
Do not add, remove, or rename fields.

{
  "address": "city, district and street, e.g. 台南市東區勝利路25號",
  "rent": {"min": 0, "max": 0},
  "sizes": [],
  "layout": {"rooms": 0, "halls": 0, "baths": 0},
  "gender": {"male": 0, "female": 0},
  "pets": -1,
  "fish": -1,
  "cooking": -1,
  "elevator": -1,
  "rent_subsidy": -1,
  "rooftop_addition": -1,
  "scooter_parking": -1,
  "car_parking": -1,
  "contacts": [
    {
      "name": "contact name",
      "phones": ["mobile number"],
      "line_ids": ["LINE ID"],
      "line_links": ["LINE link"],
      "others": ["other contact channels"]
    }
  ],
  "photos": []
}

Rules:
- rent: integers. A single price sets min = max; a range sets both ends.
- sizes: numbers given in ping only. Ignore room counts, unit counts and postal codes.
  Use -1 for a size of 100 or more, or one you cannot read.
- layout: counts of rooms, living rooms and bathrooms; 0 when not stated.
- gender: female-only is {"male": 0, "female": 1}, male-only is {"male": 1, "female": 0},
  otherwise both 0.
- pets, fish, cooking, elevator: 1 if explicitly allowed or present, 0 if explicitly
  forbidden or absent, -1 if not mentioned.
- rent_subsidy, rooftop_addition, scooter_parking, car_parking: 1 or 0 when mentioned,
  otherwise -1.
- contacts: one object per person. name is "" when not given. phones lists only mobile
  numbers that appear in the post; never invent one. Use [] for anything not given.
- photos: image URLs in the post, otherwise [].

Return one JSON object and nothing else: no explanation, no comments, no markdown.

Post:
{post}
"#;

/// Embeds a post into the extraction instructions
pub fn build_prompt(post: &str) -> String {
    TEMPLATE.replace(POST_PLACEHOLDER, post)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_is_embedded_once() {
        let prompt = build_prompt("套房出租 近火車站 6000/月");
        assert!(prompt.ends_with("套房出租 近火車站 6000/月\n"));
        assert!(!prompt.contains(POST_PLACEHOLDER));
        assert_eq!(prompt.matches("套房出租").count(), 1);
    }

    #[test]
    fn test_braces_in_post_survive() {
        let prompt = build_prompt("price {negotiable}");
        assert!(prompt.contains("price {negotiable}"));
    }
}
