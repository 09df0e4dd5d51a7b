//! Image resolution: anchors become uploaded image items, and each image
//! gets a caption from its text box, from a caption paragraph directly after
//! it, or from its description.

use crate::error::{Result, Warning};
use crate::model::{
    AssetRef, BodyElement, Document, Element, ImageAnchor, ImageItem, Paragraph, StyleKind,
};
use crate::publish::AssetUploader;
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::iter::Peekable;

/// Walks the element stream and places images where their anchors sit.
pub struct ImageResolver<'a> {
    doc: &'a Document,
    uploader: &'a mut dyn AssetUploader,
    uploaded: HashMap<String, AssetRef>,
}

impl<'a> ImageResolver<'a> {
    /// Create a resolver over a parsed document.
    pub fn new(doc: &'a Document, uploader: &'a mut dyn AssetUploader) -> Self {
        Self {
            doc,
            uploader,
            uploaded: HashMap::new(),
        }
    }

    /// Resolve every anchor in the stream.
    ///
    /// Unresolvable payloads are skipped with a warning. Upload failures
    /// abort the run.
    pub fn resolve(
        &mut self,
        elements: Vec<Element>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<Element>> {
        let mut output = Vec::with_capacity(elements.len());
        let mut stream = elements.into_iter().peekable();

        while let Some(element) = stream.next() {
            match element {
                Element::Paragraph(paragraph) => {
                    let anchors = self.anchors(paragraph.source_index);
                    if anchors.is_empty() {
                        output.push(Element::Paragraph(paragraph));
                        continue;
                    }
                    let image_only = self.is_image_only(paragraph.source_index);
                    if !image_only {
                        output.push(Element::Paragraph(paragraph));
                    }
                    let images = self.resolve_anchors(anchors, warnings)?;
                    self.place(images, &mut stream, &mut output);
                }
                Element::List(block) => {
                    let anchors: Vec<&ImageAnchor> = block
                        .items
                        .iter()
                        .flat_map(|item| self.anchors(item.source_index))
                        .collect();
                    output.push(Element::List(block));
                    if !anchors.is_empty() {
                        let images = self.resolve_anchors(anchors, warnings)?;
                        self.place(images, &mut stream, &mut output);
                    }
                }
                image @ Element::Image(_) => output.push(image),
            }
        }

        Ok(output)
    }

    fn anchors(&self, index: usize) -> Vec<&'a ImageAnchor> {
        match self.doc.body.get(index) {
            Some(BodyElement::Paragraph(source)) => source.anchors.iter().collect(),
            _ => Vec::new(),
        }
    }

    fn is_image_only(&self, index: usize) -> bool {
        matches!(self.doc.body.get(index), Some(BodyElement::Paragraph(p)) if p.is_image_only())
    }

    /// Emit images, binding a following caption paragraph to the last one.
    fn place<I>(
        &self,
        mut images: Vec<ImageItem>,
        stream: &mut Peekable<I>,
        output: &mut Vec<Element>,
    ) where
        I: Iterator<Item = Element>,
    {
        if let Some(last) = images.last_mut() {
            if last.caption.is_none() {
                if let Some(caption) = self.next_caption(stream) {
                    trace!("Caption {:?} bound to {}", caption, last.reference);
                    last.caption = Some(caption);
                }
            }
        }
        for image in &mut images {
            if image.caption.is_none() {
                image.caption = image.alt_text.clone();
            }
        }
        output.extend(images.into_iter().map(Element::Image));
    }

    /// Take the next element if it is a caption paragraph without images of
    /// its own. A caption holding images stays in the stream so that its
    /// images are resolved like any other paragraph's.
    fn next_caption<I>(&self, stream: &mut Peekable<I>) -> Option<String>
    where
        I: Iterator<Item = Element>,
    {
        match stream.peek() {
            Some(Element::Paragraph(Paragraph {
                style_kind: StyleKind::Caption,
                source_index,
                ..
            })) if self.anchors(*source_index).is_empty() => {}
            _ => return None,
        }
        match stream.next() {
            Some(Element::Paragraph(caption)) => Some(caption.plain_text().trim().to_string()),
            _ => None,
        }
    }

    fn resolve_anchors(
        &mut self,
        anchors: Vec<&ImageAnchor>,
        warnings: &mut Vec<Warning>,
    ) -> Result<Vec<ImageItem>> {
        let mut images = Vec::with_capacity(anchors.len());
        for anchor in anchors {
            if let Some(image) = self.resolve_anchor(anchor, warnings)? {
                images.push(image);
            }
        }
        Ok(images)
    }

    fn resolve_anchor(
        &mut self,
        anchor: &ImageAnchor,
        warnings: &mut Vec<Warning>,
    ) -> Result<Option<ImageItem>> {
        let reference = anchor.reference();
        let Some(rel_id) = anchor.rel_id.as_deref() else {
            skip(warnings, reference, "drawing does not reference an image");
            return Ok(None);
        };
        if let Some(reason) = self.doc.unresolved.get(rel_id) {
            skip(warnings, reference, reason);
            return Ok(None);
        }
        let Some(resource) = self.doc.get_resource(rel_id) else {
            skip(warnings, reference, "no payload was loaded for this image");
            return Ok(None);
        };

        let asset = match self.uploaded.get(rel_id) {
            Some(asset) => asset.clone(),
            None => {
                let name = resource.suggested_filename(rel_id);
                let asset = self.uploader.upload_asset(resource, &name)?;
                debug!("Uploaded {} ({} bytes) as {}", name, resource.size(), asset.label());
                self.uploaded.insert(rel_id.to_string(), asset.clone());
                asset
            }
        };

        Ok(Some(ImageItem {
            resource: resource.clone(),
            asset,
            layout: anchor.layout,
            float_alignment: anchor.float_alignment,
            caption: anchor
                .caption
                .as_deref()
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from),
            alt_text: anchor
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty())
                .map(String::from),
            reference,
        }))
    }
}

fn skip(warnings: &mut Vec<Warning>, reference: String, reason: &str) {
    let warning = Warning::AssetResolution {
        reference,
        reason: reason.to_string(),
    };
    warn!("{}", warning);
    warnings.push(warning);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::extract::RunExtractor;
    use crate::convert::lists::normalize_lists;
    use crate::error::{Error, RemoteStep};
    use crate::model::{
        FloatAlignment, ImageLayout, ListType, Resource, SourceParagraph, TextRun,
    };

    #[derive(Default)]
    struct RecordingUploader {
        names: Vec<String>,
        fail: bool,
    }

    impl AssetUploader for RecordingUploader {
        fn upload_asset(&mut self, _resource: &Resource, name: &str) -> Result<AssetRef> {
            if self.fail {
                return Err(Error::remote(RemoteStep::UploadAsset, "quota exceeded"));
            }
            self.names.push(name.to_string());
            Ok(AssetRef::ItemResource {
                resource_id: name.to_string(),
            })
        }
    }

    fn document(paragraphs: Vec<SourceParagraph>) -> Document {
        let mut doc = Document::new();
        for p in paragraphs {
            doc.push(BodyElement::Paragraph(p));
        }
        doc.add_resource(
            "rId5",
            Resource::png(vec![0; 8])
                .with_dimensions(640, 480)
                .with_filename("image1.png"),
        );
        doc
    }

    fn run(
        doc: &Document,
        uploader: &mut RecordingUploader,
    ) -> Result<(Vec<Element>, Vec<Warning>)> {
        let paragraphs = RunExtractor::new().extract(doc).paragraphs;
        let elements = normalize_lists(paragraphs);
        let mut warnings = Vec::new();
        let resolved = ImageResolver::new(doc, uploader).resolve(elements, &mut warnings)?;
        Ok((resolved, warnings))
    }

    #[test]
    fn test_floating_image_takes_caption() {
        let doc = document(vec![
            SourceParagraph::default()
                .with_anchor(ImageAnchor::floating("rId5", FloatAlignment::End)),
            SourceParagraph::with_runs(vec![TextRun::new("Figure A")]).with_style("Caption"),
            SourceParagraph::with_runs(vec![TextRun::new("After")]),
        ]);
        let mut uploader = RecordingUploader::default();
        let (elements, warnings) = run(&doc, &mut uploader).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(elements.len(), 2);
        match &elements[0] {
            Element::Image(image) => {
                assert_eq!(image.caption.as_deref(), Some("Figure A"));
                assert_eq!(image.layout, ImageLayout::Floating);
                assert_eq!(image.float_alignment, FloatAlignment::End);
            }
            other => panic!("expected image, got {:?}", other),
        }
        assert!(matches!(&elements[1], Element::Paragraph(p) if p.plain_text() == "After"));
        assert_eq!(uploader.names, vec!["image1.png"]);
    }

    #[test]
    fn test_text_paragraph_keeps_text_before_image() {
        let doc = document(vec![SourceParagraph::with_runs(vec![TextRun::new("See map")])
            .with_anchor(ImageAnchor::inline("rId5"))]);
        let (elements, _) = run(&doc, &mut RecordingUploader::default()).unwrap();

        assert_eq!(elements.len(), 2);
        assert!(matches!(&elements[0], Element::Paragraph(_)));
        assert!(matches!(&elements[1], Element::Image(i) if i.caption.is_none()));
    }

    #[test]
    fn test_missing_payload_is_skipped_with_warning() {
        let mut doc = document(vec![
            SourceParagraph::default().with_anchor(ImageAnchor::inline("rId9")),
            SourceParagraph::with_runs(vec![TextRun::new("Figure B")]).with_style("Caption"),
        ]);
        doc.unresolved
            .insert("rId9".to_string(), "media part word/media/x.png is missing".to_string());
        let (elements, warnings) = run(&doc, &mut RecordingUploader::default()).unwrap();

        assert_eq!(warnings.len(), 1);
        assert!(matches!(&warnings[0], Warning::AssetResolution { reference, .. } if reference == "rId9"));
        // Unbound caption stays in the stream as a paragraph.
        assert_eq!(elements.len(), 1);
        assert!(matches!(&elements[0], Element::Paragraph(p) if p.style_kind == StyleKind::Caption));
    }

    #[test]
    fn test_list_item_images_follow_the_list() {
        let doc = document(vec![
            SourceParagraph::with_runs(vec![TextRun::new("A")])
                .with_numbering(0, ListType::Unordered)
                .with_anchor(ImageAnchor::inline("rId5")),
            SourceParagraph::with_runs(vec![TextRun::new("B")])
                .with_numbering(0, ListType::Unordered),
        ]);
        let (elements, _) = run(&doc, &mut RecordingUploader::default()).unwrap();

        assert_eq!(elements.len(), 2);
        assert!(matches!(&elements[0], Element::List(b) if b.len() == 2));
        assert!(matches!(&elements[1], Element::Image(_)));
    }

    #[test]
    fn test_repeated_payload_uploads_once() {
        let doc = document(vec![
            SourceParagraph::default().with_anchor(ImageAnchor::inline("rId5")),
            SourceParagraph::default().with_anchor(ImageAnchor::inline("rId5")),
        ]);
        let mut uploader = RecordingUploader::default();
        let (elements, _) = run(&doc, &mut uploader).unwrap();

        assert_eq!(elements.len(), 2);
        assert_eq!(uploader.names.len(), 1);
    }

    #[test]
    fn test_caption_holding_an_image_is_not_consumed() {
        let mut doc = document(vec![
            SourceParagraph::default().with_anchor(ImageAnchor::inline("rId5")),
            SourceParagraph::with_runs(vec![TextRun::new("Figure C")])
                .with_style("Caption")
                .with_anchor(ImageAnchor::inline("rId6")),
        ]);
        doc.add_resource("rId6", Resource::png(vec![1; 8]).with_filename("image2.png"));
        let mut uploader = RecordingUploader::default();
        let (elements, warnings) = run(&doc, &mut uploader).unwrap();

        assert!(warnings.is_empty());
        assert_eq!(uploader.names, vec!["image1.png", "image2.png"]);
        let images: Vec<&ImageItem> = elements
            .iter()
            .filter_map(|e| match e {
                Element::Image(image) => Some(image),
                _ => None,
            })
            .collect();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].caption, None);
        assert!(elements
            .iter()
            .any(|e| matches!(e, Element::Paragraph(p) if p.plain_text() == "Figure C")));
    }

    #[test]
    fn test_caption_sources_in_order() {
        let doc = document(vec![
            SourceParagraph::default().with_anchor(
                ImageAnchor::inline("rId5")
                    .with_caption("Figure 1: from the text box")
                    .with_description("Valley map"),
            ),
            SourceParagraph::with_runs(vec![TextRun::new("Figure 1: below")]).with_style("Caption"),
            SourceParagraph::default()
                .with_anchor(ImageAnchor::inline("rId5").with_description("Valley map")),
            SourceParagraph::with_runs(vec![TextRun::new("Figure 2: below")]).with_style("Caption"),
            SourceParagraph::default()
                .with_anchor(ImageAnchor::inline("rId5").with_description("Valley map")),
        ]);
        let (elements, _) = run(&doc, &mut RecordingUploader::default()).unwrap();

        let captions: Vec<Option<&str>> = elements
            .iter()
            .map(|e| match e {
                Element::Image(image) => image.caption.as_deref(),
                Element::Paragraph(p) if p.style_kind == StyleKind::Caption => Some("<paragraph>"),
                _ => None,
            })
            .collect();
        assert_eq!(
            captions,
            vec![
                Some("Figure 1: from the text box"),
                Some("<paragraph>"),
                Some("Figure 2: below"),
                Some("Valley map"),
            ]
        );
        match &elements[3] {
            Element::Image(image) => assert_eq!(image.alt_text.as_deref(), Some("Valley map")),
            other => panic!("expected image, got {:?}", other),
        }
    }

    #[test]
    fn test_upload_failure_is_fatal() {
        let doc = document(vec![
            SourceParagraph::default().with_anchor(ImageAnchor::inline("rId5"))
        ]);
        let mut uploader = RecordingUploader {
            fail: true,
            ..Default::default()
        };
        let err = run(&doc, &mut uploader).unwrap_err();
        assert_eq!(err.remote_step(), Some(RemoteStep::UploadAsset));
    }
}
