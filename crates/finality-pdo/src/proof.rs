use finality_types::{ArtifactId, ContentHash, HashDomain};
use serde::{Deserialize, Serialize};

/// One artifact in a proof chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvidenceLink {
    pub artifact_id: ArtifactId,
    /// Digest of the artifact content, supplied by the collaborator.
    pub content_hash: ContentHash,
    /// Digest binding this link to every earlier one.
    pub link_hash: ContentHash,
}

/// Request, its review, and the resulting work product, hash-chained in
/// that order.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofChain {
    pub request: EvidenceLink,
    pub review: EvidenceLink,
    pub work_product: EvidenceLink,
}

fn link_hash(prev: &ContentHash, content: &ContentHash) -> ContentHash {
    ContentHash::derive(HashDomain::ProofLink, &[prev.as_bytes(), content.as_bytes()])
}

impl ProofChain {
    /// Build a consistent chain from artifact ids and content digests.
    pub fn bind(
        request: (ArtifactId, ContentHash),
        review: (ArtifactId, ContentHash),
        work_product: (ArtifactId, ContentHash),
    ) -> Self {
        let request_link = link_hash(&ContentHash::zero(), &request.1);
        let review_link = link_hash(&request_link, &review.1);
        let work_link = link_hash(&review_link, &work_product.1);
        Self {
            request: EvidenceLink {
                artifact_id: request.0,
                content_hash: request.1,
                link_hash: request_link,
            },
            review: EvidenceLink {
                artifact_id: review.0,
                content_hash: review.1,
                link_hash: review_link,
            },
            work_product: EvidenceLink {
                artifact_id: work_product.0,
                content_hash: work_product.1,
                link_hash: work_link,
            },
        }
    }

    /// Recompute every link. `Err` names the first inconsistent one.
    pub fn verify(&self) -> Result<(), &'static str> {
        let mut prev = ContentHash::zero();
        for (name, link) in self.links() {
            if link_hash(&prev, &link.content_hash) != link.link_hash {
                return Err(name);
            }
            prev = link.link_hash;
        }
        Ok(())
    }

    /// First link with a blank artifact id.
    pub fn missing_artifact(&self) -> Option<&'static str> {
        self.links()
            .into_iter()
            .find(|(_, link)| link.artifact_id.is_blank())
            .map(|(name, _)| name)
    }

    pub fn links(&self) -> [(&'static str, &EvidenceLink); 3] {
        [
            ("request", &self.request),
            ("review", &self.review),
            ("work_product", &self.work_product),
        ]
    }

    /// Digest of the whole chain.
    pub fn anchor(&self) -> ContentHash {
        self.work_product.link_hash
    }
}
