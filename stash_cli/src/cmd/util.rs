use anyhow::Result;
use stash_fs::{Resource, ResourceKind};

/// Prints resources either as aligned text or as JSON lines.
pub struct Output {
    json: bool,
}

impl Output {
    pub fn new(json: bool) -> Self {
        Self { json }
    }

    pub fn resource(&self, resource: &Resource) -> Result<()> {
        println!("{}", self.render(resource)?);
        Ok(())
    }

    pub fn resources(&self, resources: &[Resource]) -> Result<()> {
        for resource in resources {
            self.resource(resource)?;
        }
        Ok(())
    }

    fn render(&self, resource: &Resource) -> Result<String> {
        if self.json {
            return Ok(serde_json::to_string(resource)?);
        }
        let kind = match resource.kind {
            ResourceKind::File => "file",
            ResourceKind::Directory => "dir ",
        };
        let size = resource
            .size
            .map(|size| size.to_string())
            .unwrap_or_else(|| "-".to_string());
        Ok(format!("{kind} {size:>12}  {}", resource.path()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_text_and_json() {
        let file = Resource::from_key("user-1-files/docs/a.txt", 42).unwrap();
        let dir = Resource::from_key("user-1-files/docs/", 0).unwrap();

        let text = Output::new(false);
        assert_eq!(text.render(&file).unwrap(), "file           42  docs/a.txt");
        assert_eq!(text.render(&dir).unwrap(), "dir             -  docs/");

        let json = Output::new(true);
        assert_eq!(
            json.render(&file).unwrap(),
            r#"{"path":"docs/","name":"a.txt","size":42,"type":"FILE"}"#
        );
    }
}
